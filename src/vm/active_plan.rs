use crate::plan::Mutator;
use crate::util::opaque_pointer::*;
use crate::vm::VMBinding;

/// Lets the collector enumerate the mutators of the binding.
pub trait ActivePlan<VM: VMBinding> {
    /// Return whether there is a mutator bound to the thread.
    fn is_mutator(tls: VMThread) -> bool;

    /// Return an iterator over every bound mutator. The collector calls this only while the
    /// mutators are stopped, to reset their allocation buffers and scan their stacks.
    fn mutators<'a>() -> Box<dyn Iterator<Item = &'a mut Mutator<VM>> + 'a>;

    /// Return the number of bound mutators.
    fn number_of_mutators() -> usize;
}
