use crate::util::opaque_pointer::VMCollectorThread;
use crate::util::ObjectReference;
use crate::vm::ReferenceGlue;
use crate::vm::VMBinding;

/// Reference objects found while scanning to-space. Their referents are not traced; once the
/// copy is complete, a referent that was copied is live and one that was not is dead.
pub struct ReferenceProcessor {
    discovered: Vec<ObjectReference>,
}

impl ReferenceProcessor {
    pub fn new() -> Self {
        ReferenceProcessor {
            discovered: Vec::new(),
        }
    }

    /// Record a (copied) reference object.
    pub fn discover(&mut self, reference: ObjectReference) {
        self.discovered.push(reference);
    }

    pub fn discovered(&self) -> usize {
        self.discovered.len()
    }

    /// Resolve every discovered reference. `forward` returns the current address of a live
    /// referent, or `None` if the referent is dead. Dead referents are cleared and their reference
    /// objects are handed to the binding.
    pub fn process<VM: VMBinding>(
        &mut self,
        tls: VMCollectorThread,
        forward: impl Fn(ObjectReference) -> Option<ObjectReference>,
    ) {
        let mut cleared = Vec::new();
        let mut forwarded = 0;
        for reference in self.discovered.drain(..) {
            let Some(referent) = VM::VMReferenceGlue::get_referent(reference) else {
                continue;
            };
            match forward(referent) {
                Some(new_referent) => {
                    if new_referent != referent {
                        VM::VMReferenceGlue::set_referent(reference, new_referent);
                    }
                    forwarded += 1;
                }
                None => {
                    trace!("Clearing referent {} of {}", referent, reference);
                    VM::VMReferenceGlue::clear_referent(reference);
                    cleared.push(reference);
                }
            }
        }
        debug!(
            "Reference processing: {} live referents, {} cleared",
            forwarded,
            cleared.len()
        );
        if !cleared.is_empty() {
            VM::VMReferenceGlue::enqueue_references(&cleared, tls);
        }
    }
}

impl Default for ReferenceProcessor {
    fn default() -> Self {
        Self::new()
    }
}
