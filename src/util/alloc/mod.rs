//! Allocation errors and the thread-local allocation buffer.

mod allocator;
pub use allocator::AllocationError;

mod tlab;
pub use tlab::Tlab;
