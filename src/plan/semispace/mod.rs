//! A two-space copying heap with growth, shrinking and an out-of-memory safety zone.

mod gc_work;
mod global;
pub mod growth;
pub mod safety_zone;

pub use self::gc_work::Evacuator;
pub use self::global::SemiSpace;
