use crate::util::constants::BYTES_IN_WORD;
use crate::util::Address;
use std::io::Result;

/// Zero `len` bytes starting at `start`.
pub fn zero(start: Address, len: usize) {
    set(start, 0, len);
}

/// Fill `len` bytes starting at `start` with the byte `val`.
pub fn set(start: Address, val: u8, len: usize) {
    unsafe {
        std::ptr::write_bytes::<u8>(start.to_mut_ptr(), val, len);
    }
}

/// Fill a word-aligned region with a repeating word pattern.
pub fn set_pattern(start: Address, pattern: usize, len: usize) {
    debug_assert!(start.is_aligned_to(BYTES_IN_WORD));
    debug_assert!(len % BYTES_IN_WORD == 0);
    let words = len / BYTES_IN_WORD;
    let ptr = start.to_mut_ptr::<usize>();
    for i in 0..words {
        unsafe { ptr.add(i).write(pattern) };
    }
}

/// Map `size` bytes of fresh anonymous memory wherever the OS chooses.
/// The memory is demand-zero.
pub fn mmap_anywhere(size: usize) -> Result<Address> {
    let prot = libc::PROT_READ | libc::PROT_WRITE;
    let flags = libc::MAP_ANON | libc::MAP_PRIVATE;
    let ret = unsafe { libc::mmap(std::ptr::null_mut(), size, prot, flags, -1, 0) };
    if ret == libc::MAP_FAILED {
        Err(std::io::Error::last_os_error())
    } else {
        let start = Address::from_mut_ptr(ret);
        #[cfg(not(target_os = "linux"))]
        zero(start, size);
        Ok(start)
    }
}

/// Unmap memory previously returned by [`mmap_anywhere`].
pub fn munmap(start: Address, size: usize) -> Result<()> {
    wrap_libc_call(&|| unsafe { libc::munmap(start.to_mut_ptr(), size) }, 0)
}

fn wrap_libc_call<T: PartialEq>(f: &dyn Fn() -> T, expect: T) -> Result<()> {
    let ret = f();
    if ret == expect {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
