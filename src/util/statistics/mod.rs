//! Collection counters and phase timings.

mod phase_timer;
pub use phase_timer::{Phase, PhaseTimer};

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Statistics kept across collections. Written by the collector thread, read through the
/// public API.
pub struct Stats {
    timer: Mutex<PhaseTimer>,
    last_gc_end: Mutex<Instant>,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            timer: Mutex::new(PhaseTimer::new()),
            last_gc_end: Mutex::new(Instant::now()),
        }
    }

    /// Run `f` with exclusive access to the phase timer.
    pub fn with_timer<R>(&self, f: impl FnOnce(&mut PhaseTimer) -> R) -> R {
        let mut timer = self.timer.lock().unwrap();
        f(&mut timer)
    }

    /// Record the end of a collection.
    pub fn gc_finished(&self) {
        *self.last_gc_end.lock().unwrap() = Instant::now();
    }

    /// Total time spent in collections.
    pub fn accumulated_gc_time(&self) -> Duration {
        self.with_timer(|t| t.total(Phase::Total))
    }

    /// Time since the end of the last collection, or since the heap was created.
    pub fn time_since_last_gc(&self) -> Duration {
        self.last_gc_end.lock().unwrap().elapsed()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
