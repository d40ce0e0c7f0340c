use crate::util::opaque_pointer::VMCollectorThread;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// Weak, soft and finalizable reference objects.
///
/// A reference object's referent slot must not be reported by [`crate::vm::Scanning::scan_object`];
/// the collector decides its fate after the transitive copy is complete.
pub trait ReferenceGlue<VM: VMBinding> {
    /// Is this object a reference object?
    fn is_reference(_object: ObjectReference) -> bool {
        false
    }

    /// Get the referent, or `None` if it was cleared.
    fn get_referent(reference: ObjectReference) -> Option<ObjectReference>;

    /// Point the reference at a (relocated) referent.
    fn set_referent(reference: ObjectReference, referent: ObjectReference);

    /// Clear the referent.
    fn clear_referent(reference: ObjectReference);

    /// Hand the references whose referents died to the binding, for reference queues or finalization.
    fn enqueue_references(_references: &[ObjectReference], _tls: VMCollectorThread) {}
}
