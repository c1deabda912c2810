//! Memory model for the release engine
//!
//! The engine never touches memory directly; it goes through the [`Memory`]
//! trait, which reads raw bytes and releases blocks:
//! - [`heap`]: a simulated heap with tombstone tracking and a release log
//! - [`native`]: the process address space, released with the C allocator
//! - [`width`]: the variable-width integer reader built on [`Memory::read_bytes`]
//!
//! # Addresses
//!
//! Addresses are plain 64-bit integers. Address 0 is null: the engine never
//! reads through it and releasing it is a no-op, as with C `free(NULL)`.

pub mod heap;
pub mod native;
pub mod width;

use crate::constants::POINTER_WIDTH;
use thiserror::Error;

/// Memory address type (64-bit)
pub type Address = u64;

/// Failures reported by a [`Memory`] implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Null access: cannot read {size} bytes at address 0x0")]
    NullAccess { size: usize },

    #[error("Invalid read: address 0x{address:x} not in any allocated block")]
    Unmapped { address: Address },

    #[error("Buffer overrun: {size} bytes at 0x{address:x} run past the end of block 0x{block:x}")]
    OutOfBounds {
        address: Address,
        size: usize,
        block: Address,
    },

    #[error("Uninitialized read at address 0x{address:x}")]
    Uninitialized { address: Address },

    #[error("Use-after-free: address 0x{address:x} has been freed")]
    UseAfterFree { address: Address },

    #[error("Double free detected at address 0x{address:x}")]
    DoubleFree { address: Address },

    #[error("Invalid free: address 0x{address:x} was never allocated")]
    InvalidFree { address: Address },

    #[error("Cannot encode {value} as a {width}-byte integer")]
    Encode { value: u64, width: u8 },

    #[error("Out of memory: requested {requested} bytes, {allocated} already allocated, limit is {limit}")]
    OutOfMemory {
        requested: usize,
        allocated: usize,
        limit: usize,
    },
}

/// An address space the engine can read from and release blocks into
pub trait Memory {
    /// Width in bytes of a stored pointer
    fn pointer_width(&self) -> u8 {
        POINTER_WIDTH
    }

    /// Fill `buf` with the bytes starting at `address`
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<(), MemoryError>;

    /// Release the block starting at `address`
    fn release(&mut self, address: Address) -> Result<(), MemoryError>;
}
