//! Process address space
//!
//! [`NativeMemory`] reads through raw pointers and releases blocks with the C
//! allocator, for data built by C code (or by Rust code allocating through
//! `libc::malloc`). Nothing here can check an address: the caller vouches
//! for the data when constructing it.

use super::{Address, Memory, MemoryError};
use std::mem;
use std::ptr;

/// The real address space, released with `libc::free`
#[derive(Debug)]
pub struct NativeMemory {
    _private: (),
}

impl NativeMemory {
    /// # Safety
    ///
    /// Every address reached while walking a schema with this memory must be
    /// readable for the width read, and every owned pointer must come from
    /// `libc::malloc` (or a compatible allocator) and not be aliased.
    pub unsafe fn new() -> Self {
        NativeMemory { _private: () }
    }
}

impl Memory for NativeMemory {
    fn pointer_width(&self) -> u8 {
        mem::size_of::<usize>() as u8
    }

    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        if address == 0 {
            return Err(MemoryError::NullAccess { size: buf.len() });
        }
        // SAFETY: readability of the range is guaranteed by the contract of `NativeMemory::new`
        unsafe {
            ptr::copy_nonoverlapping(address as usize as *const u8, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    fn release(&mut self, address: Address) -> Result<(), MemoryError> {
        // SAFETY: owned pointers come from the C allocator per `NativeMemory::new`
        unsafe {
            libc::free(address as usize as *mut libc::c_void);
        }
        Ok(())
    }
}
