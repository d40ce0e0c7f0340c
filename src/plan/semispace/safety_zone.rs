use crate::util::Address;
use std::sync::atomic::{AtomicBool, Ordering};

/// Headroom at the end of to-space that ordinary allocation may not use. When the heap is
/// exhausted it is lent out once, so that the mutator can allocate the error it throws.
///
/// The allocation limit is derived from the to-space end and the zone flag on every read,
/// never stored, so swapping or resizing the spaces cannot leave it stale.
pub struct SafetyZone {
    size: usize,
    in_zone: AtomicBool,
}

impl SafetyZone {
    pub fn new(size: usize) -> Self {
        SafetyZone {
            size,
            in_zone: AtomicBool::new(false),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Is the zone currently lent out?
    pub fn is_in_zone(&self) -> bool {
        self.in_zone.load(Ordering::Acquire)
    }

    /// The allocation limit for a to-space ending at `end`.
    pub fn top(&self, start: Address, end: Address) -> Address {
        if self.is_in_zone() {
            end
        } else {
            // A space smaller than the zone has no usable room at all.
            end.saturating_sub(self.size).max(start)
        }
    }

    /// Lend the zone out. Returns false if it is already lent out.
    pub fn enter(&self) -> bool {
        self.in_zone
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Take the zone back if more than a whole zone is free between `mark` and `end`.
    /// Returns true if the zone was taken back.
    pub fn try_retract(&self, mark: Address, end: Address) -> bool {
        if self.is_in_zone() && end.saturating_extent(mark) > self.size {
            self.in_zone.store(false, Ordering::Release);
            true
        } else {
            false
        }
    }
}
