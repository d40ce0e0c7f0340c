use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use std::time::{Duration, Instant};
use strum_macros::AsRefStr;

/// The timed phases of a collection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Enum, AsRefStr)]
pub enum Phase {
    /// TLAB reset, pre-verification and the space swap.
    #[strum(serialize = "clear")]
    Clear,
    #[strum(serialize = "roots")]
    RootScan,
    #[strum(serialize = "boot")]
    BootHeapScan,
    #[strum(serialize = "code")]
    CodeScan,
    #[strum(serialize = "copy")]
    Copy,
    #[strum(serialize = "weak")]
    WeakRefs,
    /// The whole cycle, including verification and zapping.
    #[strum(serialize = "total")]
    Total,
}

/// Wall-clock time per phase, for the last cycle and summed over all cycles.
pub struct PhaseTimer {
    last: EnumMap<Phase, Duration>,
    total: EnumMap<Phase, Duration>,
    cycles: usize,
}

impl PhaseTimer {
    pub fn new() -> Self {
        PhaseTimer {
            last: EnumMap::default(),
            total: EnumMap::default(),
            cycles: 0,
        }
    }

    /// Forget the timings of the previous cycle.
    pub fn begin_cycle(&mut self) {
        self.last = EnumMap::default();
    }

    /// Add the timings of the current cycle to the totals.
    pub fn end_cycle(&mut self) {
        for (phase, time) in self.last.iter() {
            self.total[phase] += *time;
        }
        self.cycles += 1;
    }

    /// Time `f` as part of `phase` of the current cycle.
    pub fn time<R>(&mut self, phase: Phase, f: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let result = f();
        self.last[phase] += start.elapsed();
        result
    }

    /// Record a duration measured elsewhere.
    pub fn record(&mut self, phase: Phase, time: Duration) {
        self.last[phase] += time;
    }

    pub fn last(&self, phase: Phase) -> Duration {
        self.last[phase]
    }

    pub fn total(&self, phase: Phase) -> Duration {
        self.total[phase]
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// One line listing the last cycle's phases in milliseconds.
    pub fn last_cycle_summary(&self) -> String {
        Self::summarize(&self.last)
    }

    /// One line listing the accumulated phases in milliseconds.
    pub fn total_summary(&self) -> String {
        format!("{} cycles, {}", self.cycles, Self::summarize(&self.total))
    }

    fn summarize(times: &EnumMap<Phase, Duration>) -> String {
        times
            .iter()
            .map(|(phase, time)| format!("{}={:.3}ms", phase.as_ref(), time.as_secs_f64() * 1000.0))
            .join(", ")
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}
