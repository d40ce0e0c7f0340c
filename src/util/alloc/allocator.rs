/// The kinds of allocation failure reported to the binding through
/// [`crate::vm::Collection::out_of_memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    /// The heap cannot satisfy the request even after collecting and growing to its maximum
    /// size. The safety zone has been lent to the mutator so that it can raise an
    /// out-of-memory error of its own. The binding may continue.
    HeapOutOfMemory,
    /// The operating system refused to hand out memory for the heap. The binding is expected
    /// to terminate.
    MmapOutOfMemory,
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationError::HeapOutOfMemory => write!(f, "heap out of memory"),
            AllocationError::MmapOutOfMemory => write!(f, "mmap out of memory"),
        }
    }
}

impl std::error::Error for AllocationError {}
