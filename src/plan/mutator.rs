use crate::plan::semispace::SemiSpace;
use crate::util::alloc::{AllocationError, Tlab};
use crate::util::conversions;
use crate::util::opaque_pointer::*;
use crate::util::Address;
use crate::vm::VMBinding;

/// The per-thread allocation context. A binding creates one for each of its threads with
/// [`crate::memory_manager::bind_mutator`] and must not share it between threads.
#[repr(C)]
pub struct Mutator<VM: VMBinding> {
    /// The thread-local allocation buffer. Empty unless TLABs are enabled.
    pub tlab: Tlab,
    pub mutator_tls: VMMutatorThread,
    pub plan: &'static SemiSpace<VM>,
    alloc_disabled: usize,
}

impl<VM: VMBinding> Mutator<VM> {
    pub(crate) fn new(mutator_tls: VMMutatorThread, plan: &'static SemiSpace<VM>) -> Self {
        Mutator {
            tlab: Tlab::new(),
            mutator_tls,
            plan,
            alloc_disabled: 0,
        }
    }

    /// Allocate a zeroed cell for an object of `size` bytes. The size is rounded up to a whole
    /// number of words and to the minimum object size. TLABs are zeroed when they are granted,
    /// so the fast path only bumps the cursor.
    #[inline(always)]
    pub fn alloc(&mut self, size: usize) -> Result<Address, AllocationError> {
        if self.alloc_disabled > 0 {
            crate::util::fatal::fatal_error::<VM>(&format!(
                "Allocation by {:?} while allocation is disabled",
                self.mutator_tls
            ));
        }
        let size = conversions::cell_size(size);
        match self.tlab.alloc(size) {
            Some(cell) => Ok(cell),
            None => self.alloc_slow(size),
        }
    }

    #[inline(never)]
    fn alloc_slow(&mut self, size: usize) -> Result<Address, AllocationError> {
        let plan = self.plan;
        plan.alloc_slow(self.mutator_tls, &mut self.tlab, size)
    }

    /// Drop the TLAB. The rest of it stays allocated until the next collection. Called for every
    /// mutator at the start of a collection.
    pub fn reset_tlab(&mut self) {
        self.tlab.reset();
    }

    /// The unallocated part of the TLAB, if there is one.
    pub fn tlab_range(&self) -> Option<(Address, Address)> {
        if self.tlab.is_bound() {
            Some((self.tlab.cursor(), self.tlab.limit()))
        } else {
            None
        }
    }

    /// Allocation is disabled while the count is positive. Allocating then is fatal.
    pub fn disable_allocation(&mut self) {
        self.alloc_disabled += 1;
    }

    pub fn enable_allocation(&mut self) {
        debug_assert!(self.alloc_disabled > 0);
        self.alloc_disabled = self.alloc_disabled.saturating_sub(1);
    }

    pub fn is_allocation_disabled(&self) -> bool {
        self.alloc_disabled > 0
    }
}
