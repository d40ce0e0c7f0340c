//! Two-phase heap growth.
//!
//! The space holding live data can only be released after a collection has evacuated it, so
//! growing both spaces takes a collection in the middle:
//!
//! 1. [`GrowthManager::prepare`] obtains two new regions. If either is unavailable nothing
//!    changes. Otherwise the vacant from-space is replaced by the first region and the second is
//!    kept pending.
//! 2. The collection evacuates into the enlarged space and swaps the roles.
//! 3. [`GrowthManager::commit`] replaces the new (now vacant) from-space by the pending region.

use crate::policy::space::{MemorySpace, Region};
use crate::util::conversions;
use crate::util::options::GrowPolicySelector;
use crate::vm::VMBinding;
use probe::probe;

/// Computes the next space size from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowPolicy {
    /// Twice the current size.
    Double,
    /// The current size plus a fixed amount.
    Linear(usize),
    /// Never grow.
    None,
}

impl GrowPolicy {
    /// The policy selected by the options. `Linear` grows by the initial space size.
    pub fn from_selector(selector: GrowPolicySelector, initial_space_size: usize) -> Self {
        match selector {
            GrowPolicySelector::Double => GrowPolicy::Double,
            GrowPolicySelector::Linear => GrowPolicy::Linear(initial_space_size),
            GrowPolicySelector::None => GrowPolicy::None,
        }
    }

    pub fn growth(&self, current: usize) -> usize {
        match self {
            GrowPolicy::Double => current.saturating_mul(2),
            GrowPolicy::Linear(increment) => current.saturating_add(*increment),
            GrowPolicy::None => current,
        }
    }
}

/// Where the growth protocol stands.
#[derive(Debug, PartialEq, Eq)]
pub enum GrowState {
    /// No growth has happened yet.
    Idle,
    /// Phase 1 succeeded. The region will replace the from-space after the collection.
    Pending { grow_to: Region },
    /// The last growth completed.
    Committed,
}

/// Owns the growth state machine. The semi-space plan keeps it behind the heap lock, which also
/// serializes collections and shrinking.
pub struct GrowthManager {
    state: GrowState,
    max_space_size: usize,
}

impl GrowthManager {
    pub fn new(max_space_size: usize) -> Self {
        GrowthManager {
            state: GrowState::Idle,
            max_space_size,
        }
    }

    pub fn state(&self) -> &GrowState {
        &self.state
    }

    pub fn max_space_size(&self) -> usize {
        self.max_space_size
    }

    /// A space of this size may not grow further.
    pub fn cannot_grow(&self, current: usize) -> bool {
        current == 0 || current >= self.max_space_size
    }

    /// The size both spaces would have after growing, or `None` if they cannot grow.
    pub fn target_size(&self, policy: &GrowPolicy, current: usize) -> Option<usize> {
        if self.cannot_grow(current) {
            return None;
        }
        let new_size =
            conversions::page_align_up(policy.growth(current).min(self.max_space_size));
        if new_size > current {
            Some(new_size)
        } else {
            None
        }
    }

    /// Phase 1. Returns false, leaving everything unchanged, if the spaces are already at their
    /// maximum or if either region cannot be obtained.
    pub fn prepare<VM: VMBinding>(&mut self, policy: &GrowPolicy, from_space: &MemorySpace) -> bool {
        debug_assert!(
            !matches!(self.state, GrowState::Pending { .. }),
            "growth is already pending"
        );
        let current = from_space.size();
        let Some(new_size) = self.target_size(policy, current) else {
            debug!(
                "Cannot grow {} beyond {} with {:?}",
                from_space.name(),
                conversions::bytes_to_formatted_string(current),
                policy
            );
            return false;
        };

        let Some(grow_from) = Region::allocate::<VM>(new_size) else {
            info!(
                "Unable to grow spaces to {}",
                conversions::bytes_to_formatted_string(new_size)
            );
            return false;
        };
        let Some(grow_to) = Region::allocate::<VM>(new_size) else {
            info!(
                "Unable to grow spaces to {}",
                conversions::bytes_to_formatted_string(new_size)
            );
            grow_from.release::<VM>();
            return false;
        };

        // The from-space holds no live data between collections.
        from_space.release::<VM>();
        from_space.adopt(grow_from);
        self.state = GrowState::Pending { grow_to };
        true
    }

    /// Phase 2, after the collection swapped the spaces. `from_space` is the space that held the
    /// live data before the collection.
    pub fn commit<VM: VMBinding>(&mut self, from_space: &MemorySpace) {
        match std::mem::replace(&mut self.state, GrowState::Committed) {
            GrowState::Pending { grow_to } => {
                from_space.release::<VM>();
                from_space.adopt(grow_to);
                probe!(ssgc, grow, grow_to.size);
                info!(
                    "Grew spaces to {}",
                    conversions::bytes_to_formatted_string(grow_to.size)
                );
            }
            other => {
                self.state = other;
                crate::util::fatal::fatal_error::<VM>("Committing a growth that was not prepared");
            }
        }
    }
}
