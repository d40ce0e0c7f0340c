//! ssgc is a semi-space copying garbage collector for language runtimes.
//!
//! The heap is two equally sized spaces. Mutators allocate from thread-local allocation
//! buffers carved out of to-space and fall back to a lock-free global bump pointer. When
//! to-space fills up, a dedicated collector thread stops the mutators and evacuates every
//! reachable object into the other space. If that does not free enough memory the spaces grow,
//! and when even the largest heap is full, a reserved safety zone lets the runtime raise its
//! out-of-memory error without failing again.
//!
//! A runtime plugs in by implementing [`vm::VMBinding`] and calls into the collector through
//! [`memory_manager`].

#[macro_use]
extern crate log;

mod global_state;
pub use global_state::GlobalState;

mod heap;
pub use heap::{Heap, HeapBuilder};

pub mod memory_manager;
pub mod plan;
pub mod policy;
pub mod scheduler;
pub mod util;
pub mod vm;

pub use crate::plan::Mutator;
