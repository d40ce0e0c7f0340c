//! Memory policies. The semi-space heap is built from two [`space::MemorySpace`]s.

pub mod space;
