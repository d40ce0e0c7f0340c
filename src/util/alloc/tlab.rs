use crate::util::Address;

/// A thread-local allocation buffer: the `[cursor, limit)` sub-range of to-space that one
/// mutator bump-allocates from without synchronization.
///
/// An empty buffer has `cursor == limit == Address::ZERO`, so every fast-path
/// allocation from it fails and falls through to the slow path.
#[repr(C)]
#[derive(Debug)]
pub struct Tlab {
    pub(crate) cursor: Address,
    pub(crate) limit: Address,
}

impl Tlab {
    pub const fn new() -> Self {
        Tlab {
            cursor: Address::ZERO,
            limit: Address::ZERO,
        }
    }

    /// Install a fresh range.
    pub fn rebind(&mut self, start: Address, end: Address) {
        debug_assert!(start <= end);
        self.cursor = start;
        self.limit = end;
    }

    /// Drop the current range. The unused remainder is abandoned; the next collection reclaims it.
    pub fn reset(&mut self) {
        self.cursor = Address::ZERO;
        self.limit = Address::ZERO;
    }

    /// Is there a range installed?
    pub fn is_bound(&self) -> bool {
        !self.cursor.is_zero()
    }

    /// The next address the buffer hands out.
    pub fn cursor(&self) -> Address {
        self.cursor
    }

    /// The end of the buffer.
    pub fn limit(&self) -> Address {
        self.limit
    }

    /// Bytes left in the buffer.
    pub fn remaining(&self) -> usize {
        self.limit - self.cursor
    }

    /// Bump-allocate `size` bytes, or return `None` if they do not fit.
    #[inline(always)]
    pub fn alloc(&mut self, size: usize) -> Option<Address> {
        let result = self.cursor;
        if result.is_zero() || size > self.remaining() {
            return None;
        }
        self.cursor = result + size;
        Some(result)
    }
}

impl Default for Tlab {
    fn default() -> Self {
        Self::new()
    }
}
