//! Forwarding pointers, stored in the header word named by
//! [`crate::vm::ObjectModel::FORWARDING_WORD_OFFSET`].
//!
//! A live object has the low bit of that word clear. Forwarding overwrites the word with the
//! new address with the low bit set. Only the collector thread forwards objects, and only while
//! the mutators are stopped, so plain loads and stores suffice.

use crate::util::{Address, ObjectReference};
use crate::vm::ObjectModel;
use crate::vm::VMBinding;

const FORWARDED_TAG: usize = 0b1;

fn forwarding_word_address<VM: VMBinding>(object: ObjectReference) -> Address {
    object.to_object_start::<VM>() + VM::VMObjectModel::FORWARDING_WORD_OFFSET
}

/// Has the object been copied in the current collection?
pub fn is_forwarded<VM: VMBinding>(object: ObjectReference) -> bool {
    read_forwarding_pointer::<VM>(object).is_some()
}

/// The address of the object's copy, if it has been copied.
pub fn read_forwarding_pointer<VM: VMBinding>(object: ObjectReference) -> Option<ObjectReference> {
    let word = unsafe { forwarding_word_address::<VM>(object).load::<usize>() };
    if word & FORWARDED_TAG == FORWARDED_TAG {
        let new_object = unsafe { Address::from_usize(word & !FORWARDED_TAG) };
        Some(unsafe { ObjectReference::from_raw_address_unchecked(new_object) })
    } else {
        None
    }
}

/// Record that `object` was copied to `new_object`. Each object is forwarded at most once.
pub fn write_forwarding_pointer<VM: VMBinding>(object: ObjectReference, new_object: ObjectReference) {
    debug_assert!(
        !is_forwarded::<VM>(object),
        "{} is already forwarded to {:?}",
        object,
        read_forwarding_pointer::<VM>(object)
    );
    debug_assert!(new_object.to_raw_address() & FORWARDED_TAG == 0);
    trace!("write_forwarding_pointer({}, {})", object, new_object);
    unsafe {
        forwarding_word_address::<VM>(object)
            .store::<usize>(new_object.to_raw_address().as_usize() | FORWARDED_TAG)
    }
}
