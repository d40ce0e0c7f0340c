//! The trait [`Slot`] lets a binding decide how a reference is stored in memory.

use std::fmt::Debug;
use std::hash::Hash;

use atomic::Atomic;

use crate::util::{Address, ObjectReference};

/// A `Slot` points to a memory location holding an object reference: a field, a stack slot,
/// a global or a code literal. The collector loads the reference and, after relocating the
/// object, stores the new reference back.
///
/// A slot that holds no object (a null reference or a non-reference value) loads as `None`,
/// and the collector leaves it alone.
pub trait Slot: Copy + Send + Debug + PartialEq + Eq + Hash {
    /// Load the object reference from the slot, or `None` if the slot holds no object.
    fn load(&self) -> Option<ObjectReference>;

    /// Store an object reference into the slot.
    fn store(&self, object: ObjectReference);

    /// The address of the slot itself, used in diagnostics.
    fn address(&self) -> Address;
}

/// A word that holds an object address, with 0 meaning null.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SimpleSlot {
    slot_addr: *mut Atomic<Address>,
}

impl SimpleSlot {
    /// Create a slot from the address of the word.
    pub fn from_address(address: Address) -> Self {
        Self {
            slot_addr: address.to_mut_ptr(),
        }
    }

    /// The address of the word.
    pub fn as_address(&self) -> Address {
        Address::from_mut_ptr(self.slot_addr)
    }
}

unsafe impl Send for SimpleSlot {}

impl Slot for SimpleSlot {
    fn load(&self) -> Option<ObjectReference> {
        let addr = unsafe { (*self.slot_addr).load(atomic::Ordering::Relaxed) };
        ObjectReference::from_raw_address(addr)
    }

    fn store(&self, object: ObjectReference) {
        unsafe { (*self.slot_addr).store(object.to_raw_address(), atomic::Ordering::Relaxed) }
    }

    fn address(&self) -> Address {
        self.as_address()
    }
}
