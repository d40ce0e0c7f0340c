//! Utilities shared by the plan, the policy and the binding interface.

/// Addresses and object references.
pub mod address;
/// Allocation errors and thread-local allocation buffers.
pub mod alloc;
/// Sizes of words, pages and units.
pub mod constants;
/// Alignment and size conversions.
pub mod conversions;
/// Fatal errors reported to the binding.
pub mod fatal;
/// The built-in logger.
pub mod logger;
/// Raw memory access and mapping.
pub mod memory;
/// Forwarding pointers installed in evacuated objects.
pub mod object_forwarding;
/// Opaque thread handles.
pub mod opaque_pointer;
/// Collector options.
pub mod options;
/// Weak reference processing.
pub mod reference_processor;
/// Heap verification.
pub mod sanity;
/// Collection counts and timings.
pub mod statistics;
#[cfg(any(test, feature = "mock_test"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ByteOffset;
pub use self::address::ByteSize;
pub use self::address::ObjectReference;
pub use self::opaque_pointer::*;
