//! Schema-driven release of loaded data
//!
//! [`free`] walks a data instance along its [`Schema`] and releases every
//! owned block it reaches, then the root block itself:
//! - mappings visit their fields in order
//! - sequences resolve their element count and storage, then visit each element
//! - owned nodes are released after their children (post-order), since the
//!   pointers to those children live inside the parent's block
//!
//! # Best-effort semantics
//!
//! A count or pointer that cannot be decoded abandons only the branch it was
//! found on; siblings are still visited. The unreachable remainder leaks.
//! By default such a pass still reports success. Callers that need to know
//! use [`free_with_report`], or set [`Config::strict`] to get
//! [`FreeError::Incomplete`].
//!
//! # Stack usage
//!
//! The walk recurses once per schema level (sequence elements are iterated,
//! not recursed), so stack depth equals [`Schema::nesting_depth`], not data
//! size. Schemas modelling linked structures as mapping-in-mapping chains
//! can exhaust the stack; [`Config::with_max_depth`] bounds that.

mod walker;

use crate::config::{cfg_log, Config, LogLevel};
use crate::memory::native::NativeMemory;
use crate::memory::width::DecodeError;
use crate::memory::{Address, Memory, MemoryError};
use crate::schema::Schema;
use thiserror::Error;
use walker::Walker;

/// A branch abandoned during a free pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("Undecodable value at 0x{address:x}: {error}")]
    Decode { address: Address, error: DecodeError },

    #[error("Release of 0x{address:x} failed: {error}")]
    Release { address: Address, error: MemoryError },

    #[error("Nesting limit {limit} exceeded entering {kind} at 0x{address:x}")]
    DepthExceeded {
        address: Address,
        kind: &'static str,
        limit: usize,
    },

    #[error("Sequence at 0x{address:x} claims {count} elements, limit is {limit}")]
    SequenceTooLong {
        address: Address,
        count: u64,
        limit: u64,
    },
}

/// Errors returned by [`free`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FreeError {
    #[error("Bad parameter: configuration is missing")]
    NullConfig,

    #[error("Bad parameter: schema is missing")]
    NullSchema,

    #[error("Free incomplete: {} branch(es) abandoned", .faults.len() + .suppressed)]
    Incomplete {
        faults: Vec<Fault>,
        /// Faults beyond those kept in `faults`
        suppressed: usize,
    },
}

/// Outcome of a free pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeReport {
    /// Field and element slots dispatched, excluding the root
    pub visited: usize,
    /// Blocks released, including the root
    pub released: usize,
    /// Branches abandoned, in the order they were met, up to
    /// [`MAX_RECORDED_FAULTS`](crate::constants::MAX_RECORDED_FAULTS)
    pub faults: Vec<Fault>,
    /// Branches abandoned after `faults` was full
    pub suppressed_faults: usize,
}

impl FreeReport {
    /// True when no branch was abandoned
    pub fn is_complete(&self) -> bool {
        self.faults.is_empty() && self.suppressed_faults == 0
    }

    /// Total branches abandoned, recorded or not
    pub fn fault_count(&self) -> usize {
        self.faults.len() + self.suppressed_faults
    }
}

/// Release `data` and everything it owns according to `schema`
///
/// The root block is always released, whatever the root schema's storage;
/// `data` must not be used afterwards. A null `data` is a no-op.
pub fn free<M: Memory + ?Sized>(
    config: Option<&Config>,
    schema: Option<&Schema>,
    memory: &mut M,
    data: Address,
) -> Result<(), FreeError> {
    let report = free_with_report(config, schema, memory, data)?;
    // free_with_report only succeeds with a config present
    let strict = config.is_some_and(Config::is_strict);
    if strict && !report.is_complete() {
        return Err(FreeError::Incomplete {
            faults: report.faults,
            suppressed: report.suppressed_faults,
        });
    }
    Ok(())
}

/// Like [`free`], but returns what the pass did regardless of `strict`
pub fn free_with_report<M: Memory + ?Sized>(
    config: Option<&Config>,
    schema: Option<&Schema>,
    memory: &mut M,
    data: Address,
) -> Result<FreeReport, FreeError> {
    let config = config.ok_or(FreeError::NullConfig)?;
    let schema = schema.ok_or(FreeError::NullSchema)?;

    let mut walker = Walker::new(config, memory);
    walker.free_root(schema, data);
    let report = walker.finish();

    if !report.is_complete() {
        cfg_log!(
            config,
            LogLevel::Notice,
            "Free pass abandoned {} branch(es); {} block(s) released",
            report.fault_count(),
            report.released
        );
    }
    Ok(report)
}

/// Release C-allocated `data` in the process address space
///
/// # Safety
///
/// `data` and everything reachable from it through `schema` must be valid
/// for reads, and every owned block must come from `libc::malloc` and be
/// owned by nothing else.
pub unsafe fn free_native<T>(
    config: Option<&Config>,
    schema: Option<&Schema>,
    data: *mut T,
) -> Result<(), FreeError> {
    let mut memory = NativeMemory::new();
    free(config, schema, &mut memory, data as usize as Address)
}
