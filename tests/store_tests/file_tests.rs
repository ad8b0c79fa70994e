//! Tests for FileStore
//!
//! These tests verify:
//! - Allocation starts after the size header and is monotonic
//! - Out-of-range reads are absent, out-of-range writes fail
//! - The size header survives a reopen
//! - Temporary stores delete their file on close
//! - Concurrent allocations never overlap

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use towerdb::store::{FileStore, Store, StoreExt, BLOCK_PREFIX_SIZE, STORE_HEADER_SIZE};
use towerdb::TowerError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.tdb");
    (temp_dir, path)
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_new_store_holds_only_header() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();

    assert_eq!(store.size(), STORE_HEADER_SIZE);
    assert!(store.is_open());
    assert_eq!(store.path(), Some(path.as_path()));
}

#[test]
fn test_allocate_is_monotonic() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();

    assert_eq!(store.allocate(10).unwrap(), 8);
    assert_eq!(store.allocate(4).unwrap(), 18);
    assert_eq!(store.size(), 22);
}

#[test]
fn test_concurrent_allocations_do_not_overlap() {
    let (_temp, path) = setup_temp_store();
    let store = Arc::new(FileStore::open(&path).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..250)
                    .map(|_| store.allocate(16).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut positions = HashSet::new();
    for handle in handles {
        for position in handle.join().unwrap() {
            assert_eq!((position - STORE_HEADER_SIZE) % 16, 0);
            assert!(positions.insert(position));
        }
    }
    assert_eq!(positions.len(), 1000);
    assert_eq!(store.size(), STORE_HEADER_SIZE + 16_000);
}

// =============================================================================
// Read/Write Tests
// =============================================================================

#[test]
fn test_write_then_read() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    let position = store.allocate(5).unwrap();

    assert_eq!(store.write(b"hello", position).unwrap(), 5);
    assert_eq!(store.read(position, 5).unwrap().unwrap().as_ref(), b"hello");
}

#[test]
fn test_read_past_size_is_absent() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    let position = store.allocate(4).unwrap();

    assert!(store.read(position, 5).unwrap().is_none());
    assert!(store.read(1_000, 1).unwrap().is_none());
    assert!(store.read(u64::MAX, 2).unwrap().is_none());
}

#[test]
fn test_allocated_but_unwritten_reads_zeroes() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    let position = store.allocate(6).unwrap();

    assert_eq!(store.read(position, 6).unwrap().unwrap().as_ref(), &[0u8; 6]);
}

#[test]
fn test_write_outside_allocation_fails() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    store.allocate(4).unwrap();

    assert!(matches!(store.write(b"12345", 8), Err(TowerError::Storage(_))));
    assert!(matches!(store.write(b"1", 0), Err(TowerError::Storage(_))));
}

#[test]
fn test_blocks_and_objects() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();

    let block = store.write_block(b"payload").unwrap();
    assert_eq!(store.size(), block + BLOCK_PREFIX_SIZE + 7);
    assert_eq!(store.read_block(block).unwrap().unwrap().as_ref(), b"payload");

    let object = store.append_object(&"text".to_string()).unwrap();
    let decoded: Option<String> = store.read_block_object(object).unwrap();
    assert_eq!(decoded.as_deref(), Some("text"));

    let slot = store.allocate(8).unwrap();
    store.write_object(&42u64, slot).unwrap();
    assert_eq!(store.read_object::<u64>(slot, 8).unwrap(), Some(42));
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_size_survives_reopen() {
    let (_temp, path) = setup_temp_store();
    let position = {
        let store = FileStore::open(&path).unwrap();
        let position = store.write_block(b"durable").unwrap();
        store.close().unwrap();
        position
    };

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.size(), position + BLOCK_PREFIX_SIZE + 7);
    assert_eq!(store.read_block(position).unwrap().unwrap().as_ref(), b"durable");
}

#[test]
fn test_close_twice_and_use_after_close() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    store.allocate(8).unwrap();

    assert!(store.close().unwrap());
    assert!(!store.close().unwrap());
    assert!(!store.is_open());
    assert!(matches!(store.read(8, 8), Err(TowerError::StoreClosed)));
    assert!(matches!(store.allocate(1), Err(TowerError::StoreClosed)));
}

#[test]
fn test_allocate_after_close_keeps_size() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    store.allocate(32).unwrap();
    let size = store.size();
    store.close().unwrap();

    for _ in 0..3 {
        assert!(matches!(store.allocate(16), Err(TowerError::StoreClosed)));
    }
    assert_eq!(store.size(), size);

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.size(), size);
}

#[test]
fn test_temporary_store_is_deleted_on_close() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open_temporary(&path).unwrap();
    assert!(store.is_temporary());
    store.write_block(b"scratch").unwrap();
    assert!(path.exists());

    store.close().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_delete_removes_file() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    store.delete().unwrap();
    assert!(!path.exists());
    assert!(!store.is_open());
}

#[test]
fn test_reset_starts_over() {
    let (_temp, path) = setup_temp_store();
    let store = FileStore::open(&path).unwrap();
    store.write_block(b"gone").unwrap();

    store.reset().unwrap();
    assert_eq!(store.size(), STORE_HEADER_SIZE);
    assert_eq!(store.allocate(1).unwrap(), STORE_HEADER_SIZE);
}

#[test]
fn test_nested_parent_directories_are_created() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("a").join("b").join("store.tdb");
    let store = FileStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.size(), STORE_HEADER_SIZE);
}

#[test]
fn test_corrupt_header_is_rejected() {
    let (_temp, path) = setup_temp_store();
    std::fs::write(&path, 3u64.to_be_bytes()).unwrap();

    assert!(matches!(FileStore::open(&path), Err(TowerError::Corruption(_))));
}
