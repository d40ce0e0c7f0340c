use crate::util::memory;
use crate::util::Address;

/// The source of the memory backing the two spaces.
pub trait VirtualMemory {
    /// Obtain `size` bytes of zeroed, page-aligned memory, or `None` if it is not available.
    fn allocate(size: usize) -> Option<Address> {
        match memory::mmap_anywhere(size) {
            Ok(start) => Some(start),
            Err(e) => {
                warn!("Failed to map {} bytes: {}", size, e);
                None
            }
        }
    }

    /// Return memory previously obtained from [`VirtualMemory::allocate`]. `start` and `size` may
    /// describe the tail of an allocated region.
    fn deallocate(start: Address, size: usize) {
        if let Err(e) = memory::munmap(start, size) {
            warn!("Failed to unmap {} bytes at {}: {}", size, start, e);
        }
    }
}

/// Anonymous `mmap` memory.
pub struct DefaultVirtualMemory;

impl VirtualMemory for DefaultVirtualMemory {}
