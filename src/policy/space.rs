use crate::util::conversions;
use crate::util::{Address, ObjectReference};
use crate::vm::VMBinding;
use crate::vm::VirtualMemory;

use atomic::Atomic;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A contiguous block of memory obtained from [`VirtualMemory`] but not yet owned by a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: Address,
    pub size: usize,
}

impl Region {
    /// Obtain a fresh region from the binding.
    pub fn allocate<VM: VMBinding>(size: usize) -> Option<Region> {
        debug_assert!(conversions::raw_is_aligned(
            size,
            crate::util::constants::BYTES_IN_PAGE
        ));
        VM::VMMemory::allocate(size).map(|start| Region { start, size })
    }

    /// Give the region back.
    pub fn release<VM: VMBinding>(self) {
        if self.size > 0 {
            VM::VMMemory::deallocate(self.start, self.size);
        }
    }
}

/// A contiguous address range with a bump allocation mark. The heap consists of two of them that
/// swap roles at every collection.
///
/// The range changes only while the heap lock is held (growth) or while mutators are stopped
/// (swap, shrink). The mark is advanced concurrently by mutators through
/// [`MemorySpace::compare_exchange_mark`].
pub struct MemorySpace {
    name: &'static str,
    start: Atomic<Address>,
    size: AtomicUsize,
    mark: Atomic<Address>,
}

impl MemorySpace {
    /// A space that owns no memory yet.
    pub fn new(name: &'static str) -> Self {
        MemorySpace {
            name,
            start: Atomic::new(Address::ZERO),
            size: AtomicUsize::new(0),
            mark: Atomic::new(Address::ZERO),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn start(&self) -> Address {
        self.start.load(Ordering::Acquire)
    }

    pub fn size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    pub fn end(&self) -> Address {
        self.start() + self.size()
    }

    /// The allocation mark. Everything in `[start, mark)` has been handed out.
    pub fn mark(&self) -> Address {
        self.mark.load(Ordering::Acquire)
    }

    /// Bytes between the start and the mark.
    pub fn used(&self) -> usize {
        self.mark().saturating_extent(self.start())
    }

    /// Does the space cover this address?
    pub fn contains(&self, addr: Address) -> bool {
        addr.is_in_range(self.start(), self.size())
    }

    /// Does the space cover this object?
    pub fn contains_object<VM: VMBinding>(&self, object: ObjectReference) -> bool {
        self.contains(object.to_object_start::<VM>())
    }

    /// Advance the mark from `old` to `new` if no other thread moved it first.
    pub fn compare_exchange_mark(&self, old: Address, new: Address) -> Result<Address, Address> {
        debug_assert!(new >= old);
        self.mark
            .compare_exchange(old, new, Ordering::AcqRel, Ordering::Acquire)
    }

    /// Set the mark directly. Only the collector does this, with mutators stopped.
    pub fn set_mark(&self, mark: Address) {
        debug_assert!(mark >= self.start() && mark <= self.end());
        self.mark.store(mark, Ordering::Release);
    }

    /// Move the mark back to the start of the space.
    pub fn reset_mark(&self) {
        self.mark.store(self.start(), Ordering::Release);
    }

    /// Take ownership of a region, which replaces the current range. The caller must have
    /// released the old range first. The mark moves to the new start.
    pub fn adopt(&self, region: Region) {
        self.start.store(region.start, Ordering::Release);
        self.size.store(region.size, Ordering::Release);
        self.reset_mark();
        debug!("{} adopted {}", self.name, self);
    }

    /// Give the whole range back to the binding. The space is empty afterwards.
    pub fn release<VM: VMBinding>(&self) {
        let old = Region {
            start: self.start(),
            size: self.size(),
        };
        self.start.store(Address::ZERO, Ordering::Release);
        self.size.store(0, Ordering::Release);
        self.mark.store(Address::ZERO, Ordering::Release);
        old.release::<VM>();
    }

    /// Give the last `bytes` of the range back to the binding. The mark must not lie in the
    /// released tail.
    pub fn shrink_tail<VM: VMBinding>(&self, bytes: usize) {
        let size = self.size();
        debug_assert!(bytes <= size);
        let new_end = self.start() + (size - bytes);
        debug_assert!(self.mark() <= new_end || self.mark().is_zero());
        self.size.store(size - bytes, Ordering::Release);
        VM::VMMemory::deallocate(new_end, bytes);
        debug!("{} shrunk by {} to {}", self.name, bytes, self);
    }
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}[{}, {}) mark={} size={}",
            self.name,
            self.start(),
            self.end(),
            self.mark(),
            conversions::bytes_to_formatted_string(self.size())
        )
    }
}
