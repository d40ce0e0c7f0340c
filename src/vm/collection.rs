use crate::scheduler::GCController;
use crate::util::alloc::AllocationError;
use crate::util::opaque_pointer::*;
use crate::vm::VMBinding;

/// Thread management the collector needs from the binding.
pub trait Collection<VM: VMBinding> {
    /// Stop every mutator at a safepoint. When this returns, no mutator may touch the heap
    /// until [`Collection::resume_mutators`] is called.
    ///
    /// Arguments:
    /// * `tls`: The collector thread.
    fn stop_all_mutators(tls: VMCollectorThread);

    /// Resume the mutators stopped by [`Collection::stop_all_mutators`].
    fn resume_mutators(tls: VMCollectorThread);

    /// The mutator is about to block inside the heap, waiting for the heap lock or for a
    /// collection to complete. Until [`Collection::unblock_after_gc`] is called for it, the
    /// mutator does not touch objects, so [`Collection::stop_all_mutators`] must count it as
    /// stopped rather than wait for it to reach a safepoint.
    ///
    /// Arguments:
    /// * `tls`: The blocking mutator.
    fn block_for_gc(_tls: VMMutatorThread) {}

    /// The mutator blocked by [`Collection::block_for_gc`] has left the heap and may touch
    /// objects again. The binding may hold it here while a collection is still in progress.
    fn unblock_after_gc(_tls: VMMutatorThread) {}

    /// Start the dedicated collector thread. The thread must call `GCController::run` with the
    /// controller it is given. The default uses a plain `std` thread.
    ///
    /// Arguments:
    /// * `tls`: The thread that called `initialize_collection`.
    /// * `controller`: The collector to run.
    fn spawn_gc_thread(_tls: VMThread, mut controller: Box<GCController<VM>>) {
        let spawned = std::thread::Builder::new()
            .name("ssgc-collector".to_string())
            .spawn(move || {
                controller.run(VMCollectorThread(VMThread::UNINITIALIZED));
            });
        if let Err(e) = spawned {
            crate::util::fatal::fatal_error::<VM>(&format!(
                "Unable to spawn the collector thread: {}",
                e
            ));
        }
    }

    /// Inform the binding that an allocation could not be satisfied. For
    /// [`AllocationError::HeapOutOfMemory`] the safety zone has just been lent to the heap, so the
    /// binding can allocate and raise its out-of-memory error. This is called exactly once per
    /// failed allocation.
    ///
    /// Arguments:
    /// * `tls`: The mutator whose allocation failed.
    /// * `err_kind`: The type of out-of-memory error.
    fn out_of_memory(_tls: VMThread, err_kind: AllocationError) {
        warn!("Out of memory with {:?}", err_kind);
    }

    /// Terminate the process. Called when the heap is in a state that cannot be trusted: an
    /// allocation while allocation is disabled, a failure during a collection, or running out of
    /// memory again while the safety zone is lent out. The message has already been logged.
    fn fatal_error(_message: &str) -> ! {
        std::process::abort()
    }
}
