//! Tests for concurrent map access
//!
//! These tests verify:
//! - Writers on disjoint keys lose no updates
//! - Optimistic readers see only committed values
//! - Handles opened on the same name share one lock
//! - The same holds on a file-backed store, and survives reopen

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use towerdb::skiplist::{DiskMap, SkipListMap};
use towerdb::MapFactory;

const THREADS: i64 = 4;
const CYCLES: i64 = 5_000;

#[test]
fn test_disjoint_put_get_remove_cycles() {
    let factory = MapFactory::in_memory().unwrap();
    let map: SkipListMap<i64> = factory.skip_list_map("shared").unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let map = map.clone();
            thread::spawn(move || {
                for i in 0..CYCLES {
                    let key = t * 1_000_000 + i;
                    map.put(key, i).unwrap();
                    assert_eq!(map.get(key).unwrap(), Some(i));
                    if i % 2 == 0 {
                        assert_eq!(map.remove(key).unwrap(), Some(i));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.len() as i64, THREADS * CYCLES / 2);
    for t in 0..THREADS {
        assert_eq!(map.get(t * 1_000_000 + 1).unwrap(), Some(1));
        assert!(map.get(t * 1_000_000 + 2).unwrap().is_none());
    }

    let keys: Vec<i64> = map
        .keys()
        .unwrap()
        .iter()
        .map(|k| k.as_i64().unwrap())
        .collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_disjoint_cycles_on_file_store() {
    const FILE_CYCLES: i64 = 500;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.tdb");
    {
        let factory = MapFactory::open(&path).unwrap();
        let map: SkipListMap<i64> = factory.skip_list_map("shared").unwrap();

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let map = map.clone();
                thread::spawn(move || {
                    for i in 0..FILE_CYCLES {
                        let key = t * 1_000_000 + i;
                        map.put(key, i).unwrap();
                        assert_eq!(map.get(key).unwrap(), Some(i));
                        if i % 2 == 0 {
                            assert_eq!(map.remove(key).unwrap(), Some(i));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(map.len() as i64, THREADS * FILE_CYCLES / 2);
        factory.close().unwrap();
    }

    let factory = MapFactory::open(&path).unwrap();
    let map: SkipListMap<i64> = factory.skip_list_map("shared").unwrap();
    assert_eq!(map.len() as i64, THREADS * FILE_CYCLES / 2);

    let keys: Vec<i64> = map
        .keys()
        .unwrap()
        .iter()
        .map(|k| k.as_i64().unwrap())
        .collect();
    assert_eq!(keys.len() as i64, THREADS * FILE_CYCLES / 2);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert!(keys.iter().all(|k| k % 2 == 1));
    for t in 0..THREADS {
        assert_eq!(map.get(t * 1_000_000 + 1).unwrap(), Some(1));
        assert!(map.get(t * 1_000_000 + 2).unwrap().is_none());
    }
}

#[test]
fn test_readers_during_writes() {
    let factory = MapFactory::in_memory().unwrap();
    let map: SkipListMap<i64> = factory.skip_list_map("readers").unwrap();
    for key in 0..100i64 {
        map.put(key, key).unwrap();
    }

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let map = map.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    for key in 0..100i64 {
                        let value = map.get(key).unwrap().unwrap();
                        assert!(value == key || value == key + 1_000);
                    }
                }
            })
        })
        .collect();

    for key in 0..100i64 {
        map.put(key, key + 1_000).unwrap();
        map.put(1_000 + key, key).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(map.len(), 200);
}

#[test]
fn test_handles_on_same_name_share_state() {
    let factory = Arc::new(MapFactory::in_memory().unwrap());
    let handles: Vec<_> = (0..4i64)
        .map(|t| {
            let factory = Arc::clone(&factory);
            thread::spawn(move || {
                let map: SkipListMap<i64> = factory.skip_list_map("named").unwrap();
                for i in 0..250i64 {
                    map.put(t * 1_000 + i, i).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let map: SkipListMap<i64> = factory.skip_list_map("named").unwrap();
    assert_eq!(map.len(), 1_000);
    assert_eq!(factory.map_names().unwrap(), vec!["named".to_string()]);
}
