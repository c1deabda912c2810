// Free passes over malloc-allocated data in the process address space

mod common;

use common::*;
use memschema::config::Config;
use memschema::memory::native::NativeMemory;
use memschema::memory::Address;
use memschema::release::{free_native, free_with_report, FreeError};
use memschema::schema::{Field, Schema};
use std::ffi::{c_char, CString};
use std::mem::{offset_of, size_of};
use std::ptr;

#[repr(C)]
struct Item {
    name: *mut c_char,
}

#[repr(C)]
struct Catalog {
    count: u32,
    items: *mut *mut Item,
}

fn native_catalog_schema() -> Schema {
    let item = Schema::mapping(
        size_of::<Item>(),
        vec![Field::new("name", offset_of!(Item, name), Schema::string())],
    )
    .owned();
    let count_offset = offset_of!(Catalog, count) as isize - offset_of!(Catalog, items) as isize;

    Schema::mapping(
        size_of::<Catalog>(),
        vec![
            Field::new("count", offset_of!(Catalog, count), Schema::uint(4)),
            Field::new(
                "items",
                offset_of!(Catalog, items),
                Schema::sequence(item, count_offset, 4).owned(),
            ),
        ],
    )
}

unsafe fn malloc_catalog(names: &[&str]) -> *mut Catalog {
    let items = libc::malloc(size_of::<*mut Item>() * names.len().max(1)) as *mut *mut Item;
    for (i, name) in names.iter().enumerate() {
        let item = libc::malloc(size_of::<Item>()) as *mut Item;
        let text = CString::new(*name).unwrap();
        (*item).name = libc::strdup(text.as_ptr());
        *items.add(i) = item;
    }

    let catalog = libc::malloc(size_of::<Catalog>()) as *mut Catalog;
    (*catalog).count = names.len() as u32;
    (*catalog).items = items;
    catalog
}

#[test]
fn test_native_catalog_release() {
    let (config, lines) = capturing_config();
    let schema = native_catalog_schema();

    let catalog = unsafe { malloc_catalog(&["alpha", "beta", "gamma"]) };
    let root = catalog as usize as Address;
    let items = unsafe { (*catalog).items } as usize as Address;

    let result = unsafe { free_native(Some(&config), Some(&schema), catalog) };

    assert_eq!(result, Ok(()));
    let traced = traced_releases(&lines);
    assert_eq!(traced.len(), 8);
    assert_eq!(traced[traced.len() - 2], items);
    assert_eq!(traced[traced.len() - 1], root);
}

#[test]
fn test_native_report() {
    let schema = native_catalog_schema();
    let catalog = unsafe { malloc_catalog(&["only"]) };

    let report = unsafe {
        let mut memory = NativeMemory::new();
        free_with_report(
            Some(&Config::default()),
            Some(&schema),
            &mut memory,
            catalog as usize as Address,
        )
    }
    .expect("free failed");

    assert_eq!(report.released, 4);
    assert!(report.is_complete());
}

#[test]
fn test_native_null_root() {
    let schema = native_catalog_schema();
    let result = unsafe {
        free_native::<Catalog>(Some(&Config::default()), Some(&schema), ptr::null_mut())
    };
    assert_eq!(result, Ok(()));
}

#[test]
fn test_native_missing_arguments() {
    let schema = native_catalog_schema();
    let catalog = unsafe { malloc_catalog(&[]) };

    let result = unsafe { free_native(None, Some(&schema), catalog) };
    assert_eq!(result, Err(FreeError::NullConfig));

    let result = unsafe { free_native(Some(&Config::default()), None, catalog) };
    assert_eq!(result, Err(FreeError::NullSchema));

    // Still owned by the test after both rejections
    let result = unsafe { free_native(Some(&Config::default()), Some(&schema), catalog) };
    assert_eq!(result, Ok(()));
}

#[test]
fn test_native_pointer_width_matches_host() {
    use memschema::memory::Memory;
    let memory = unsafe { NativeMemory::new() };
    assert_eq!(memory.pointer_width() as usize, size_of::<usize>());
}
