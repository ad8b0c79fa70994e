//! Tests for SkipListMap basics
//!
//! These tests verify:
//! - Round-trip, overwrite and remove semantics
//! - Ordering of level 0 after random inserts
//! - Mixed numeric key types resolve to the same entry
//! - Iteration helpers (keys, values, entries, references, first/last)
//! - Record ids and lookups by record id

use std::collections::HashSet;

use rand::seq::SliceRandom;
use towerdb::skiplist::{DiskMap, SkipListMap, NODE_SIZE};
use towerdb::types::{Reference, Value};
use towerdb::MapFactory;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_map(name: &str) -> (MapFactory, SkipListMap<String>) {
    let factory = MapFactory::in_memory().unwrap();
    let map = factory.skip_list_map(name).unwrap();
    (factory, map)
}

// =============================================================================
// Basic Operation Tests
// =============================================================================

#[test]
fn test_insert_scenario() {
    let (_factory, map) = setup_map("scenario");
    for key in [10i64, 20, 5, 15] {
        map.put(key, format!("v{}", key)).unwrap();
    }

    assert_eq!(map.get(5i64).unwrap().as_deref(), Some("v5"));
    assert_eq!(map.len(), 4);

    let expected: HashSet<u64> = [15i64, 20]
        .into_iter()
        .map(|k| map.get_rec_id(k).unwrap().unwrap())
        .collect();
    assert_eq!(map.above(12i64, true).unwrap(), expected);
}

#[test]
fn test_put_then_get() {
    let (_factory, map) = setup_map("roundtrip");
    assert!(map.put("alpha", "one".to_string()).unwrap().is_none());

    assert_eq!(map.get("alpha").unwrap().as_deref(), Some("one"));
    assert!(map.get("beta").unwrap().is_none());
    assert!(map.contains_key("alpha").unwrap());
    assert!(!map.contains_key("beta").unwrap());
}

#[test]
fn test_overwrite_returns_previous_and_keeps_size() {
    let (_factory, map) = setup_map("overwrite");
    map.put(1, "first".to_string()).unwrap();
    let rec_id = map.get_rec_id(1).unwrap();

    let previous = map.put(1, "second".to_string()).unwrap();
    assert_eq!(previous.as_deref(), Some("first"));
    assert_eq!(map.get(1).unwrap().as_deref(), Some("second"));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get_rec_id(1).unwrap(), rec_id);
}

#[test]
fn test_remove() {
    let (_factory, map) = setup_map("remove");
    map.put("a", "1".to_string()).unwrap();
    map.put("b", "2".to_string()).unwrap();

    assert_eq!(map.remove("a").unwrap().as_deref(), Some("1"));
    assert!(map.get("a").unwrap().is_none());
    assert_eq!(map.len(), 1);

    assert!(map.remove("never").unwrap().is_none());
    assert_eq!(map.len(), 1);

    map.remove("b").unwrap();
    assert!(map.is_empty());
    assert!(map.first_key().unwrap().is_none());
}

#[test]
fn test_remove_then_reinsert() {
    let (_factory, map) = setup_map("reinsert");
    for i in 0..50i64 {
        map.put(i, i.to_string()).unwrap();
    }
    for i in (0..50i64).step_by(2) {
        map.remove(i).unwrap();
    }
    for i in (0..50i64).step_by(4) {
        map.put(i, format!("again{}", i)).unwrap();
    }

    assert_eq!(map.len(), 25 + 13);
    assert_eq!(map.get(4i64).unwrap().as_deref(), Some("again4"));
    assert!(map.get(2i64).unwrap().is_none());
    assert_eq!(map.get(3i64).unwrap().as_deref(), Some("3"));
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_level_zero_is_sorted() {
    let (_factory, map) = setup_map("sorted");
    let mut keys: Vec<i64> = (0..500).collect();
    keys.shuffle(&mut rand::thread_rng());
    for key in &keys {
        map.put(*key, key.to_string()).unwrap();
    }

    let stored: Vec<i64> = map
        .keys()
        .unwrap()
        .iter()
        .map(|k| k.as_i64().unwrap())
        .collect();
    let expected: Vec<i64> = (0..500).collect();
    assert_eq!(stored, expected);
    assert_eq!(map.len(), 500);
}

#[test]
fn test_text_keys_are_lexical() {
    let (_factory, map) = setup_map("text");
    for key in ["pear", "apple", "banana", "Zebra"] {
        map.put(key, key.to_uppercase()).unwrap();
    }

    let keys: Vec<Value> = map.keys().unwrap();
    assert_eq!(
        keys,
        vec![
            Value::from("Zebra"),
            Value::from("apple"),
            Value::from("banana"),
            Value::from("pear"),
        ]
    );
}

#[test]
fn test_mixed_numeric_keys_share_entries() {
    let (_factory, map) = setup_map("mixed");
    map.put(Value::Long(7), "seven".to_string()).unwrap();

    assert_eq!(map.get(7i32).unwrap().as_deref(), Some("seven"));
    assert_eq!(map.get(Value::Double(7.0)).unwrap().as_deref(), Some("seven"));

    map.put(7i16, "SEVEN".to_string()).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(7i64).unwrap().as_deref(), Some("SEVEN"));
}

#[test]
fn test_heterogeneous_families_coexist() {
    let (_factory, map) = setup_map("families");
    map.put("text", "t".to_string()).unwrap();
    map.put(3, "n".to_string()).unwrap();
    map.put(Value::Null, "null".to_string()).unwrap();
    map.put(true, "b".to_string()).unwrap();

    assert_eq!(
        map.values().unwrap(),
        vec!["null".to_string(), "b".to_string(), "n".to_string(), "t".to_string()]
    );
    assert_eq!(map.first_key().unwrap(), Some(Value::Null));
    assert_eq!(map.last_key().unwrap(), Some(Value::from("text")));
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_entries_and_references() {
    let (_factory, map) = setup_map("iter");
    map.put_all([(2, "b".to_string()), (1, "a".to_string())]).unwrap();

    let entries = map.entries().unwrap();
    assert_eq!(entries[0], (Value::Int(1), "a".to_string()));
    assert_eq!(entries[1], (Value::Int(2), "b".to_string()));

    let references = map.references(3).unwrap();
    assert_eq!(
        references,
        vec![
            Reference::new(3, map.get_rec_id(1).unwrap().unwrap()),
            Reference::new(3, map.get_rec_id(2).unwrap().unwrap()),
        ]
    );
}

#[test]
fn test_contains_value_scans() {
    let (_factory, map) = setup_map("values");
    map.put(1, "x".to_string()).unwrap();
    map.put(2, "y".to_string()).unwrap();

    assert!(map.contains_value(&"y".to_string()).unwrap());
    assert!(!map.contains_value(&"z".to_string()).unwrap());
}

#[test]
fn test_clear_empties_map() {
    let (_factory, map) = setup_map("clear");
    for i in 0..20 {
        map.put(i, i.to_string()).unwrap();
    }

    map.clear().unwrap();
    assert!(map.is_empty());
    assert!(map.get(5).unwrap().is_none());
    assert!(map.keys().unwrap().is_empty());

    map.put(5, "back".to_string()).unwrap();
    assert_eq!(map.len(), 1);
}

// =============================================================================
// Record Id Tests
// =============================================================================

#[test]
fn test_get_with_rec_id() {
    let (_factory, map) = setup_map("recid");
    map.put("k", "value".to_string()).unwrap();
    let rec_id = map.get_rec_id("k").unwrap().unwrap();

    assert_eq!(map.get_with_rec_id(rec_id).unwrap().as_deref(), Some("value"));
    assert!(map.get_rec_id("missing").unwrap().is_none());
}

#[test]
fn test_bad_rec_ids_are_absent() {
    let (factory, map) = setup_map("badrec");
    map.put("k", "value".to_string()).unwrap();

    assert!(map.get_with_rec_id(0).unwrap().is_none());
    assert!(map.get_with_rec_id(factory.store().size() + 100).unwrap().is_none());
    assert!(map.get_with_rec_id(u64::MAX).unwrap().is_none());
    assert!(map.get_with_rec_id(u64::MAX - NODE_SIZE as u64).unwrap().is_none());
    assert!(map.get_with_rec_id(u64::MAX - 10).unwrap().is_none());
}

#[test]
fn test_max_level_follows_load_factor() {
    let factory = MapFactory::in_memory().unwrap();
    let low: SkipListMap<u64> = factory.skip_list_map_with_load_factor("low", 1).unwrap();
    let high: SkipListMap<u64> = factory.skip_list_map_with_load_factor("high", 10).unwrap();
    let default: SkipListMap<u64> = factory.skip_list_map("default").unwrap();

    assert_eq!(low.max_level(), 7);
    assert_eq!(high.max_level(), 32);
    assert_eq!(default.max_level(), 19);
}
