use crate::vm::VMBinding;
use crossbeam::channel::{self, Receiver, Sender};
use std::marker::PhantomData;
use std::sync::OnceLock;

/// Work the collector thread performs with the mutators stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorRequest {
    /// Run one collection.
    Collect,
    /// Run one collection, then give back this many bytes from the tail of each space if they
    /// are free.
    Shrink(usize),
}

pub(crate) type RequestMessage = (CollectorRequest, Sender<bool>);

/// This data structure lets mutators hand work to the collector thread and wait for the result.
/// Callers are serialized by the heap lock, so at most one request is in flight.
pub struct GCRequester<VM: VMBinding> {
    sender: OnceLock<Sender<RequestMessage>>,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> GCRequester<VM> {
    pub fn new() -> Self {
        GCRequester {
            sender: OnceLock::new(),
            phantom: PhantomData,
        }
    }

    /// Create the channel. The returned receiver belongs to the collector thread.
    pub(crate) fn connect(&self) -> Receiver<RequestMessage> {
        let (sender, receiver) = channel::unbounded();
        if self.sender.set(sender).is_err() {
            panic!("The collector thread is already connected");
        }
        receiver
    }

    pub fn is_connected(&self) -> bool {
        self.sender.get().is_some()
    }

    /// Send a request and block until the collector thread has completed it.
    pub fn request(&self, request: CollectorRequest) -> bool {
        let Some(sender) = self.sender.get() else {
            panic!("GC is not allowed here: collection is not initialized (did you call initialize_collection()?).");
        };
        let (reply_sender, reply_receiver) = channel::bounded(1);
        if sender.send((request, reply_sender)).is_err() {
            crate::util::fatal::fatal_error::<VM>("The collector thread has terminated");
        }
        match reply_receiver.recv() {
            Ok(result) => result,
            Err(_) => crate::util::fatal::fatal_error::<VM>(&format!(
                "The collector thread did not complete {:?}",
                request
            )),
        }
    }
}

impl<VM: VMBinding> Default for GCRequester<VM> {
    fn default() -> Self {
        Self::new()
    }
}
