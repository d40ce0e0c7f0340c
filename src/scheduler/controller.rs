//! The collector thread.
//!
//! There is exactly one. It waits for requests from mutators, stops the world, performs the
//! request and replies.

use std::panic::{self, AssertUnwindSafe};

use crossbeam::channel::Receiver;

use super::gc_requester::{CollectorRequest, RequestMessage};
use crate::heap::Heap;
use crate::util::opaque_pointer::VMCollectorThread;
use crate::vm::{Collection, VMBinding};

/// The thread local struct for the collector thread.
pub struct GCController<VM: VMBinding> {
    /// The heap this thread collects.
    heap: &'static Heap<VM>,
    /// The receiving end of the request channel.
    receiver: Receiver<RequestMessage>,
}

impl<VM: VMBinding> GCController<VM> {
    pub(crate) fn new(heap: &'static Heap<VM>, receiver: Receiver<RequestMessage>) -> Box<Self> {
        Box::new(GCController { heap, receiver })
    }

    /// The collector loop. The binding calls this on the thread it spawned in
    /// [`Collection::spawn_gc_thread`]. It returns only when the heap is torn down.
    pub fn run(&mut self, tls: VMCollectorThread) {
        loop {
            debug!("[Collector: Waiting for request...]");
            let Ok((request, reply)) = self.receiver.recv() else {
                debug!("[Collector: Request channel closed]");
                return;
            };
            debug!("[Collector: {:?} received]", request);
            let result = self.do_request(tls, request);
            // The requester may only be gone if it panicked while waiting.
            let _ = reply.send(result);
        }
    }

    /// Stop the world, perform the request, resume the world. A panic during a collection
    /// leaves the heap half evacuated, so it is fatal.
    fn do_request(&self, tls: VMCollectorThread, request: CollectorRequest) -> bool {
        let plan = &self.heap.plan;
        VM::VMCollection::stop_all_mutators(tls);
        let result = panic::catch_unwind(AssertUnwindSafe(|| match request {
            CollectorRequest::Collect => {
                plan.collect(tls);
                true
            }
            CollectorRequest::Shrink(bytes) => {
                plan.collect(tls);
                plan.shrink_after_collection(bytes)
            }
        }));
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                let message = e
                    .downcast_ref::<String>()
                    .map(|s| s.as_str())
                    .or_else(|| e.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic");
                crate::util::fatal::fatal_error::<VM>(&format!(
                    "Exception during GC: {}",
                    message
                ))
            }
        };
        VM::VMCollection::resume_mutators(tls);
        result
    }
}
