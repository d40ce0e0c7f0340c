use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// State shared by the heap and the collector thread that does not belong to any one space.
pub struct GlobalState {
    /// Has the collector thread been started?
    pub(crate) initialized: AtomicBool,
    /// The number of completed collections. A collection in progress has the epoch of the
    /// previous count.
    epoch: AtomicUsize,
}

impl GlobalState {
    /// Has [`crate::memory_manager::initialize_collection`] been called?
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn epoch(&self) -> usize {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            epoch: AtomicUsize::new(0),
        }
    }
}
