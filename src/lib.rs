//! # Introduction
//!
//! memschema releases C-style data structures generically. A [`schema::Schema`]
//! describes a structure's shape (scalars, mappings, sequences, and which
//! of them sit behind owned pointers); [`release::free`] walks an instance
//! along that description and releases every block it owns, children first.
//!
//! ## Pipeline
//!
//! ```text
//! Config + Schema + Address → Walker → Memory::release (post-order) → root release
//! ```
//!
//! 1. [`schema`]: the type descriptors (`Kind`, `Storage`, `Field`).
//! 2. [`memory`]: the [`memory::Memory`] address-space trait, the
//!    variable-width integer reader, a simulated [`memory::heap::Heap`]
//!    with a release log, and [`memory::native::NativeMemory`] for
//!    `malloc`-allocated data.
//! 3. [`release`]: the free pass itself, its [`release::FreeReport`] and
//!    [`release::FreeError`].
//! 4. [`config`]: log level, log callback and the optional guards.
//!
//! ## Example
//!
//! ```
//! use memschema::config::Config;
//! use memschema::memory::heap::Heap;
//! use memschema::release::free;
//! use memschema::schema::{Field, Schema};
//!
//! // struct { char *name; }
//! let schema = Schema::mapping(8, vec![Field::new("name", 0, Schema::string())]);
//!
//! let mut heap = Heap::default();
//! let root = heap.allocate(8).unwrap();
//! let name = heap.allocate_str("widget").unwrap();
//! heap.write_pointer(root, name).unwrap();
//!
//! free(Some(&Config::default()), Some(&schema), &mut heap, root).unwrap();
//! assert_eq!(heap.release_log(), &[name, root]);
//! ```

pub mod config;
pub mod constants;
pub mod memory;
pub mod release;
pub mod schema;

pub use config::{Config, LogLevel};
pub use memory::{Address, Memory};
pub use release::{free, free_with_report, FreeError, FreeReport};
pub use schema::{Field, Kind, Schema, Storage};
