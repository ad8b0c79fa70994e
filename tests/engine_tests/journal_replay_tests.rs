//! Tests for journal replay on open
//!
//! These tests verify:
//! - Journaled puts, removes and clears are replayed into their maps
//! - A damaged journal tail does not block opening
//! - The journal is truncated once replay is durable

use std::fs::{self, OpenOptions};
use std::io::Write;

use tempfile::TempDir;
use towerdb::config::{Config, WalSyncStrategy};
use towerdb::engine::Engine;
use towerdb::skiplist::{DiskMap, SkipListMap};
use towerdb::types::Value;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(temp_dir: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .commit_interval_ms(0)
        .build()
}

/// Run `writes` on a fresh engine, then lose the store file but keep the journal
fn crash_after<F>(temp: &TempDir, writes: F)
where
    F: FnOnce(&Engine),
{
    let engine = Engine::open(test_config(temp)).unwrap();
    writes(&engine);
    let data_path = engine.data_path();
    drop(engine);
    fs::remove_file(data_path).unwrap();
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_restores_puts_and_removes() {
    let temp = TempDir::new().unwrap();
    crash_after(&temp, |engine| {
        let map: SkipListMap<String> = engine.map("users").unwrap();
        map.put(1i64, "one".to_string()).unwrap();
        map.put(2i64, "two".to_string()).unwrap();
        map.put(3i64, "three".to_string()).unwrap();
        map.put(2i64, "TWO".to_string()).unwrap();
        map.remove(3i64).unwrap();
    });

    let engine = Engine::open(test_config(&temp)).unwrap();
    let map: SkipListMap<String> = engine.map("users").unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get(2i64).unwrap().as_deref(), Some("TWO"));
    assert!(map.get(3i64).unwrap().is_none());
    assert_eq!(engine.journal_lsn(), Some(1));
}

#[test]
fn test_replay_handles_clear_across_maps() {
    let temp = TempDir::new().unwrap();
    crash_after(&temp, |engine| {
        let keep: SkipListMap<u64> = engine.map("keep").unwrap();
        let wipe: SkipListMap<u64> = engine.map("wipe").unwrap();
        keep.put("a", 1).unwrap();
        wipe.put("b", 2).unwrap();
        wipe.clear().unwrap();
        wipe.put("c", 3).unwrap();
    });

    let engine = Engine::open(test_config(&temp)).unwrap();
    let keep: SkipListMap<u64> = engine.map("keep").unwrap();
    let wipe: SkipListMap<u64> = engine.map("wipe").unwrap();
    assert_eq!(keep.get("a").unwrap(), Some(1));
    assert_eq!(wipe.keys().unwrap(), vec![Value::from("c")]);
}

#[test]
fn test_replay_over_existing_store_is_idempotent() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open(test_config(&temp)).unwrap();
        let map: SkipListMap<u64> = engine.map("counts").unwrap();
        map.put("x", 1).unwrap();
        map.put("y", 2).unwrap();
        // Dropped without commit: the journal still holds both puts
    }

    let engine = Engine::open(test_config(&temp)).unwrap();
    let map: SkipListMap<u64> = engine.map("counts").unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map.get("y").unwrap(), Some(2));
}

#[test]
fn test_damaged_tail_is_ignored() {
    let temp = TempDir::new().unwrap();
    crash_after(&temp, |engine| {
        let map: SkipListMap<u64> = engine.map("m").unwrap();
        map.put("ok", 1).unwrap();
    });

    let journal = temp.path().join("journal.wal");
    let mut file = OpenOptions::new().append(true).open(&journal).unwrap();
    file.write_all(&[0xDE, 0xAD, 0xBE]).unwrap();
    drop(file);

    let engine = Engine::open(test_config(&temp)).unwrap();
    let map: SkipListMap<u64> = engine.map("m").unwrap();
    assert_eq!(map.get("ok").unwrap(), Some(1));
    assert_eq!(fs::metadata(&journal).unwrap().len(), 0);
}
