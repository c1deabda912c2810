// Constants for the memory model

/// Starting address for simulated heap allocations
/// Heap addresses start at 0x10000000 so a stray small integer is never mistaken for a block
pub const HEAP_ADDRESS_START: u64 = 0x1000_0000;

/// Width in bytes of a pointer stored in the simulated heap
pub const POINTER_WIDTH: u8 = 8;

/// Alignment applied to every simulated heap block
pub const HEAP_BLOCK_ALIGN: u64 = 8;

/// Default simulated heap limit: 10 MB
pub const DEFAULT_HEAP_LIMIT: usize = 10 * 1024 * 1024;

/// The null address
pub const NULL_ADDRESS: u64 = 0;

/// Faults kept in a free report; further faults are only counted
pub const MAX_RECORDED_FAULTS: usize = 64;
