//! The heap instance and its builder.

use crate::global_state::GlobalState;
use crate::plan::semispace::SemiSpace;
use crate::scheduler::GCRequester;
use crate::util::options::Options;
use crate::util::statistics::Stats;
use crate::vm::VMBinding;

use std::sync::Arc;

/// Collects options before the heap exists. Options can no longer change once
/// [`crate::memory_manager::ssgc_init`] has built the heap.
pub struct HeapBuilder {
    pub options: Options,
}

impl HeapBuilder {
    /// Create a builder with default options, overridden by `SSGC_*` environment variables.
    pub fn new() -> Self {
        HeapBuilder {
            options: Options::default(),
        }
    }

    /// Create a builder with default options, ignoring the environment.
    pub fn new_no_env_vars() -> Self {
        HeapBuilder {
            options: Options::new_without_env(),
        }
    }

    /// Set an option by name. Returns false if the name or the value was rejected.
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        self.options.set_from_str(name, val)
    }

    /// Set options from a whitespace separated list of `name=value` pairs.
    pub fn set_options_bulk_by_str(&mut self, options: &str) -> bool {
        self.options.set_bulk_from_command_line(options)
    }

    pub(crate) fn build<VM: VMBinding>(&self) -> Heap<VM> {
        Heap::new(Arc::new(self.options.clone()))
    }
}

impl Default for HeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A heap instance. Bindings usually keep one in a static, since mutators and the collector
/// thread hold `&'static` references to it.
pub struct Heap<VM: VMBinding> {
    pub(crate) options: Arc<Options>,
    pub(crate) state: Arc<GlobalState>,
    pub(crate) stats: Arc<Stats>,
    pub(crate) gc_requester: Arc<GCRequester<VM>>,
    pub plan: SemiSpace<VM>,
}

impl<VM: VMBinding> Heap<VM> {
    fn new(options: Arc<Options>) -> Self {
        let state = Arc::new(GlobalState::default());
        let stats = Arc::new(Stats::new());
        let gc_requester = Arc::new(GCRequester::new());
        let plan = SemiSpace::new(
            options.clone(),
            state.clone(),
            stats.clone(),
            gc_requester.clone(),
        );
        Heap {
            options,
            state,
            stats,
            gc_requester,
            plan,
        }
    }

    pub fn get_options(&self) -> &Options {
        &self.options
    }

    /// Per-phase timings accumulated over every collection so far.
    pub fn gc_timings_summary(&self) -> String {
        self.stats.with_timer(|timer| timer.total_summary())
    }
}
