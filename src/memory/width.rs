//! Variable-width unsigned integer access
//!
//! Counts and pointers are stored in host byte order at widths of 1, 2, 4
//! or 8 bytes. [`read_uint`] never reads more than `width` bytes and reports
//! a [`DecodeError`] instead of trapping.

use super::{Address, Memory, MemoryError};
use thiserror::Error;

/// Failure to decode an integer from memory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unsupported integer width: {0} bytes")]
    UnsupportedWidth(u8),

    #[error("Cannot read {width}-byte integer at 0x{address:x}: {source}")]
    Unreadable {
        address: Address,
        width: u8,
        #[source]
        source: MemoryError,
    },

    #[error("Value {value} does not fit in {width} bytes")]
    Overflow { value: u64, width: u8 },
}

fn checked_width(width: u8) -> Result<usize, DecodeError> {
    match width {
        1 | 2 | 4 | 8 => Ok(width as usize),
        _ => Err(DecodeError::UnsupportedWidth(width)),
    }
}

/// Read an unsigned integer of `width` bytes at `address`
pub fn read_uint<M: Memory + ?Sized>(
    memory: &M,
    width: u8,
    address: Address,
) -> Result<u64, DecodeError> {
    let len = checked_width(width)?;
    let mut buf = [0u8; 8];
    memory
        .read_bytes(address, &mut buf[..len])
        .map_err(|source| DecodeError::Unreadable {
            address,
            width,
            source,
        })?;

    let value = match len {
        1 => buf[0] as u64,
        2 => u16::from_ne_bytes([buf[0], buf[1]]) as u64,
        4 => u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64,
        _ => u64::from_ne_bytes(buf),
    };
    Ok(value)
}

/// Read a pointer-sized value at `address`
pub fn read_pointer<M: Memory + ?Sized>(memory: &M, address: Address) -> Result<Address, DecodeError> {
    read_uint(memory, memory.pointer_width(), address)
}

/// Encode `value` as `width` bytes in host byte order
pub fn encode_uint(width: u8, value: u64) -> Result<Vec<u8>, DecodeError> {
    let len = checked_width(width)?;
    if len < 8 && value >> (len * 8) != 0 {
        return Err(DecodeError::Overflow { value, width });
    }

    let bytes = match len {
        1 => vec![value as u8],
        2 => (value as u16).to_ne_bytes().to_vec(),
        4 => (value as u32).to_ne_bytes().to_vec(),
        _ => value.to_ne_bytes().to_vec(),
    };
    Ok(bytes)
}
