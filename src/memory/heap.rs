//! Simulated heap
//!
//! This module provides a byte-addressed heap with:
//! - Explicit allocation/release
//! - Tombstone tracking for released blocks
//! - Per-byte initialization tracking
//! - Use-after-free, double-free and invalid-free detection
//! - A release log recording every successful release in order
//!
//! Building a structure here and running a free pass over it shows exactly
//! which blocks were released, in which order, and which were leaked.

use super::width::encode_uint;
use super::{Address, Memory, MemoryError};
use crate::constants::{DEFAULT_HEAP_LIMIT, HEAP_ADDRESS_START, HEAP_BLOCK_ALIGN, POINTER_WIDTH};
use rustc_hash::FxHashMap;

/// State of a heap block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockState {
    Allocated,
    Tombstone, // Released but kept so later accesses are diagnosed
}

/// A block of heap memory
#[derive(Debug, Clone)]
pub struct HeapBlock {
    pub data: Vec<u8>,
    pub size: usize,
    pub state: BlockState,
    pub init_map: Vec<bool>,
}

impl HeapBlock {
    pub fn new(size: usize) -> Self {
        HeapBlock {
            data: vec![0; size],
            size,
            state: BlockState::Allocated,
            init_map: vec![false; size],
        }
    }

    /// Check if a byte range is initialized
    pub fn is_initialized(&self, offset: usize, size: usize) -> bool {
        if offset + size > self.size {
            return false;
        }
        self.init_map[offset..offset + size].iter().all(|&b| b)
    }

    fn contains(&self, base: Address, address: Address) -> bool {
        address >= base && address < base + self.size as u64
    }
}

/// The heap
#[derive(Debug, Clone)]
pub struct Heap {
    allocations: FxHashMap<Address, HeapBlock>,
    next_address: Address,
    live_bytes: usize,
    max_heap_size: usize,
    release_log: Vec<Address>,
}

impl Heap {
    /// Create a new heap with a maximum size limit
    pub fn new(max_heap_size: usize) -> Self {
        Heap {
            allocations: FxHashMap::default(),
            next_address: HEAP_ADDRESS_START,
            live_bytes: 0,
            max_heap_size,
            release_log: Vec::new(),
        }
    }

    /// Allocate a block of memory
    pub fn allocate(&mut self, size: usize) -> Result<Address, MemoryError> {
        let fits = self
            .live_bytes
            .checked_add(size)
            .is_some_and(|total| total <= self.max_heap_size);
        if !fits {
            return Err(MemoryError::OutOfMemory {
                requested: size,
                allocated: self.live_bytes,
                limit: self.max_heap_size,
            });
        }

        let addr = self.next_address;
        // Zero-sized blocks still get a distinct address
        let span = (size as u64).max(1);
        self.next_address += span.div_ceil(HEAP_BLOCK_ALIGN) * HEAP_BLOCK_ALIGN;
        self.allocations.insert(addr, HeapBlock::new(size));
        self.live_bytes += size;

        Ok(addr)
    }

    /// Release a block of memory (mark as tombstone)
    pub fn free(&mut self, addr: Address) -> Result<(), MemoryError> {
        match self.allocations.get_mut(&addr) {
            Some(block) if block.state == BlockState::Allocated => {
                block.state = BlockState::Tombstone;
                self.live_bytes -= block.size;
                self.release_log.push(addr);
                Ok(())
            }
            Some(_) => Err(MemoryError::DoubleFree { address: addr }),
            None => Err(MemoryError::InvalidFree { address: addr }),
        }
    }

    /// Get a heap block (returns error if tombstone or doesn't exist)
    pub fn get_block(&self, addr: Address) -> Result<&HeapBlock, MemoryError> {
        match self.allocations.get(&addr) {
            Some(block) if block.state == BlockState::Allocated => Ok(block),
            Some(_) => Err(MemoryError::UseAfterFree { address: addr }),
            None => Err(MemoryError::Unmapped { address: addr }),
        }
    }

    /// Find the live block containing `addr`, returning its base and the offset into it
    fn locate(&self, addr: Address) -> Result<(Address, usize), MemoryError> {
        let (&base, block) = self
            .allocations
            .iter()
            .find(|(base, block)| block.contains(**base, addr))
            .ok_or(MemoryError::Unmapped { address: addr })?;

        if block.state == BlockState::Tombstone {
            return Err(MemoryError::UseAfterFree { address: addr });
        }
        Ok((base, (addr - base) as usize))
    }

    /// Write bytes starting at an address; the range must lie within one block
    pub fn write_bytes_at(&mut self, addr: Address, bytes: &[u8]) -> Result<(), MemoryError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let (base, offset) = self.locate(addr)?;
        let block = self
            .allocations
            .get_mut(&base)
            .ok_or(MemoryError::Unmapped { address: addr })?;

        if offset + bytes.len() > block.size {
            return Err(MemoryError::OutOfBounds {
                address: addr,
                size: bytes.len(),
                block: base,
            });
        }
        block.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        block.init_map[offset..offset + bytes.len()].fill(true);
        Ok(())
    }

    /// Read bytes starting at an address into `buf`
    pub fn read_bytes_at(&self, addr: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        if buf.is_empty() {
            return Ok(());
        }
        let (base, offset) = self.locate(addr)?;
        let block = self.get_block(base)?;

        if offset + buf.len() > block.size {
            return Err(MemoryError::OutOfBounds {
                address: addr,
                size: buf.len(),
                block: base,
            });
        }
        if !block.is_initialized(offset, buf.len()) {
            let first = block.init_map[offset..offset + buf.len()]
                .iter()
                .position(|&b| !b)
                .unwrap_or(0);
            return Err(MemoryError::Uninitialized {
                address: addr + first as u64,
            });
        }
        buf.copy_from_slice(&block.data[offset..offset + buf.len()]);
        Ok(())
    }

    /// Store an unsigned integer of `width` bytes
    pub fn write_uint(&mut self, addr: Address, width: u8, value: u64) -> Result<(), MemoryError> {
        let bytes = encode_uint(width, value).map_err(|_| MemoryError::Encode { value, width })?;
        self.write_bytes_at(addr, &bytes)
    }

    /// Store a pointer
    pub fn write_pointer(&mut self, addr: Address, target: Address) -> Result<(), MemoryError> {
        self.write_uint(addr, POINTER_WIDTH, target)
    }

    /// Allocate a NUL-terminated copy of `text`
    pub fn allocate_str(&mut self, text: &str) -> Result<Address, MemoryError> {
        let addr = self.allocate(text.len() + 1)?;
        self.write_bytes_at(addr, text.as_bytes())?;
        self.write_bytes_at(addr + text.len() as u64, &[0])?;
        Ok(addr)
    }

    /// Addresses of blocks not yet released, in ascending order
    pub fn live_blocks(&self) -> Vec<Address> {
        let mut live: Vec<Address> = self
            .allocations
            .iter()
            .filter(|(_, block)| block.state == BlockState::Allocated)
            .map(|(&addr, _)| addr)
            .collect();
        live.sort_unstable();
        live
    }

    pub fn is_live(&self, addr: Address) -> bool {
        self.get_block(addr).is_ok()
    }

    /// Every successful release, in order
    pub fn release_log(&self) -> &[Address] {
        &self.release_log
    }

    /// How many times `addr` has been released
    pub fn release_count(&self, addr: Address) -> usize {
        self.release_log.iter().filter(|&&a| a == addr).count()
    }

    /// Get bytes held by live blocks
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(DEFAULT_HEAP_LIMIT)
    }
}

impl Memory for Heap {
    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<(), MemoryError> {
        if address == 0 {
            return Err(MemoryError::NullAccess { size: buf.len() });
        }
        self.read_bytes_at(address, buf)
    }

    fn release(&mut self, address: Address) -> Result<(), MemoryError> {
        if address == 0 {
            return Ok(());
        }
        self.free(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_are_distinct_and_aligned() {
        let mut heap = Heap::default();
        let a = heap.allocate(3).unwrap();
        let b = heap.allocate(0).unwrap();
        let c = heap.allocate(16).unwrap();

        assert_eq!(a, HEAP_ADDRESS_START);
        assert!(a < b && b < c);
        assert_eq!(b % HEAP_BLOCK_ALIGN, 0);
        assert_eq!(c % HEAP_BLOCK_ALIGN, 0);
        assert_eq!(heap.live_blocks(), vec![a, b, c]);
    }

    #[test]
    fn test_out_of_memory() {
        let mut heap = Heap::new(8);
        heap.allocate(6).unwrap();
        assert!(matches!(
            heap.allocate(4),
            Err(MemoryError::OutOfMemory { requested: 4, .. })
        ));
    }

    #[test]
    fn test_oversized_request_does_not_overflow() {
        let mut heap = Heap::default();
        heap.allocate(16).unwrap();
        assert!(matches!(
            heap.allocate(usize::MAX),
            Err(MemoryError::OutOfMemory {
                requested: usize::MAX,
                allocated: 16,
                ..
            })
        ));
        assert_eq!(heap.live_bytes(), 16);
    }

    #[test]
    fn test_free_tombstones_and_logs() {
        let mut heap = Heap::default();
        let a = heap.allocate(8).unwrap();
        heap.write_uint(a, 4, 1).unwrap();

        heap.free(a).unwrap();
        assert!(!heap.is_live(a));
        assert_eq!(heap.release_log(), &[a]);
        assert_eq!(heap.live_bytes(), 0);

        let mut buf = [0u8; 4];
        assert_eq!(
            heap.read_bytes_at(a, &mut buf),
            Err(MemoryError::UseAfterFree { address: a })
        );
    }

    #[test]
    fn test_double_and_invalid_free() {
        let mut heap = Heap::default();
        let a = heap.allocate(8).unwrap();
        heap.free(a).unwrap();

        assert_eq!(heap.free(a), Err(MemoryError::DoubleFree { address: a }));
        assert_eq!(
            heap.free(a + 4),
            Err(MemoryError::InvalidFree { address: a + 4 })
        );
        assert_eq!(heap.release_count(a), 1);
    }

    #[test]
    fn test_uninitialized_and_out_of_bounds_reads() {
        let mut heap = Heap::default();
        let a = heap.allocate(8).unwrap();
        heap.write_uint(a, 2, 0xffff).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(
            heap.read_bytes_at(a, &mut buf),
            Err(MemoryError::Uninitialized { address: a + 2 })
        );

        let mut wide = [0u8; 8];
        assert!(matches!(
            heap.read_bytes_at(a + 4, &mut wide),
            Err(MemoryError::OutOfBounds { block, .. }) if block == a
        ));
    }

    #[test]
    fn test_release_through_memory_trait() {
        let mut heap = Heap::default();
        let s = heap.allocate_str("abc").unwrap();

        let mut buf = [0u8; 4];
        heap.read_bytes(s, &mut buf).unwrap();
        assert_eq!(&buf, b"abc\0");

        assert_eq!(heap.release(0), Ok(()));
        assert!(heap.release_log().is_empty());
        assert_eq!(heap.release(s), Ok(()));
        assert_eq!(
            heap.read_bytes(0, &mut buf),
            Err(MemoryError::NullAccess { size: 4 })
        );
    }
}
