use crate::util::constants::BYTES_IN_WORD;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;

/// The parts of the object layout the collector touches.
///
/// Every object starts with at least one header word. The word at
/// [`ObjectModel::FORWARDING_WORD_OFFSET`] is overwritten with a tagged forwarding pointer when the
/// object is evacuated, so its lowest bit must be clear in every live object. The type
/// descriptor (hub) pointer of the binding satisfies this since it is word aligned.
pub trait ObjectModel<VM: VMBinding> {
    /// Offset of the header word reused for forwarding, from the object start.
    const FORWARDING_WORD_OFFSET: usize = 0;

    /// Size of an array header, used by `alloc_array`.
    const ARRAY_HEADER_BYTES: usize = 2 * BYTES_IN_WORD;

    /// The size of the object in bytes, including its header.
    fn get_current_size(object: ObjectReference) -> usize;

    /// The start of the cell holding the object.
    fn ref_to_object_start(object: ObjectReference) -> Address {
        object.to_raw_address()
    }

    /// The object whose cell starts at `start`.
    fn address_to_ref(start: Address) -> ObjectReference {
        debug_assert!(!start.is_zero());
        unsafe { ObjectReference::from_raw_address_unchecked(start) }
    }

    /// Dump the object for debugging. Used when verification fails.
    fn dump_object(object: ObjectReference);
}
