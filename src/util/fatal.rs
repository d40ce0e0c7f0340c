use crate::vm::Collection;
use crate::vm::VMBinding;

/// Log the message and terminate through the binding. Used for conditions after which the heap
/// can no longer be trusted.
pub fn fatal_error<VM: VMBinding>(message: &str) -> ! {
    error!("Fatal error: {}", message);
    VM::VMCollection::fatal_error(message)
}
