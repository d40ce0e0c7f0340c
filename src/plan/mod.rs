//! The collector proper: the semi-space plan and the per-thread mutator context.

mod mutator;
pub use mutator::Mutator;

pub mod semispace;
