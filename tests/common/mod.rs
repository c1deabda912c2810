// Shared fixtures for the integration tests
#![allow(dead_code)]

use memschema::config::{Config, LogLevel};
use memschema::memory::heap::Heap;
use memschema::memory::Address;
use memschema::schema::{Field, Schema};
use std::sync::{Arc, Mutex};

pub type LogLines = Arc<Mutex<Vec<(LogLevel, String)>>>;

/// Config logging everything into a shared buffer
pub fn capturing_config() -> (Config, LogLines) {
    let lines: LogLines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let config = Config::new()
        .with_log_level(LogLevel::Debug)
        .with_logger(move |level, args| {
            sink.lock().unwrap().push((level, args.to_string()));
        });
    (config, lines)
}

/// Addresses reported by "Freeing allocation" trace lines, in order
pub fn traced_releases(lines: &LogLines) -> Vec<Address> {
    lines
        .lock()
        .unwrap()
        .iter()
        .filter_map(|(_, line)| line.strip_prefix("Freeing allocation: 0x"))
        .map(|hex| Address::from_str_radix(hex, 16).unwrap())
        .collect()
}

/// Schema for `struct item { char *name; }`, held by pointer
pub fn item_schema() -> Schema {
    Schema::mapping(8, vec![Field::new("name", 0, Schema::string())]).owned()
}

/// Schema for `struct root { uint32_t count; struct item **items; }`
pub fn catalog_schema() -> Schema {
    Schema::mapping(
        16,
        vec![
            Field::new("count", 0, Schema::uint(4)),
            Field::new("items", 8, Schema::sequence(item_schema(), -8, 4).owned()),
        ],
    )
}

/// Blocks of a catalog built in a simulated heap
pub struct Catalog {
    pub root: Address,
    pub items: Address,
    pub entries: Vec<(Address, Address)>, // (item, name)
}

/// Build a catalog instance with one item per name
pub fn build_catalog(heap: &mut Heap, names: &[&str]) -> Catalog {
    let root = heap.allocate(16).unwrap();
    let items = heap.allocate(8 * names.len()).unwrap();

    let mut entries = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let item = heap.allocate(8).unwrap();
        let text = heap.allocate_str(name).unwrap();
        heap.write_pointer(item, text).unwrap();
        heap.write_pointer(items + 8 * i as u64, item).unwrap();
        entries.push((item, text));
    }

    heap.write_uint(root, 4, names.len() as u64).unwrap();
    heap.write_pointer(root + 8, items).unwrap();

    Catalog {
        root,
        items,
        entries,
    }
}

/// Schema for `struct root { uint32_t count; char **names; }`
pub fn names_schema() -> Schema {
    Schema::mapping(
        16,
        vec![
            Field::new("count", 0, Schema::uint(4)),
            Field::new("names", 8, Schema::sequence(Schema::string(), -8, 4).owned()),
        ],
    )
}

/// Build a names instance; returns (root, array, strings)
pub fn build_names(heap: &mut Heap, count: usize) -> (Address, Address, Vec<Address>) {
    let root = heap.allocate(16).unwrap();
    let array = heap.allocate(8 * count).unwrap();

    let mut strings = Vec::new();
    for i in 0..count {
        let text = heap.allocate_str(&format!("name-{}", i)).unwrap();
        heap.write_pointer(array + 8 * i as u64, text).unwrap();
        strings.push(text);
    }

    heap.write_uint(root, 4, count as u64).unwrap();
    heap.write_pointer(root + 8, array).unwrap();
    (root, array, strings)
}
