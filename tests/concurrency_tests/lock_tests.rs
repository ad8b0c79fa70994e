//! Tests for StampedLock
//!
//! These tests verify:
//! - The stamp is odd exactly while a writer holds the lock
//! - Optimistic reads fall back when a write intervenes
//! - Writers are mutually exclusive

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use towerdb::concurrency::StampedLock;

#[test]
fn test_stamp_parity() {
    let lock = StampedLock::new();
    let before = lock.stamp();
    assert!(!lock.is_write_locked());

    lock.write(|| {
        assert!(lock.is_write_locked());
        assert!(!lock.validate(before));
    });

    assert!(!lock.is_write_locked());
    assert_eq!(lock.stamp(), before + 2);
    assert!(!lock.validate(before));
    assert!(lock.validate(lock.stamp()));
}

#[test]
fn test_optimistic_read_without_writer_runs_once() {
    let lock = StampedLock::new();
    let runs = AtomicUsize::new(0);

    let value = lock.optimistic_read(|| {
        runs.fetch_add(1, Ordering::SeqCst);
        42
    });
    assert_eq!(value, 42);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_optimistic_read_retries_after_write() {
    let lock = Arc::new(StampedLock::new());
    let runs = AtomicUsize::new(0);

    let result = lock.optimistic_read(|| {
        // A write completing during the first run invalidates it
        if runs.fetch_add(1, Ordering::SeqCst) == 0 {
            let writer = Arc::clone(&lock);
            thread::spawn(move || writer.write(|| ())).join().unwrap();
            "stale"
        } else {
            "fresh"
        }
    });

    assert_eq!(result, "fresh");
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn test_writers_exclude_each_other() {
    let lock = Arc::new(StampedLock::new());
    let inside = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    lock.write(|| {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(lock.stamp(), 8_000);
}

#[test]
fn test_panicking_writer_releases_stamp() {
    let lock = Arc::new(StampedLock::new());
    let writer = Arc::clone(&lock);
    let result = thread::spawn(move || writer.write(|| panic!("boom"))).join();

    assert!(result.is_err());
    assert!(!lock.is_write_locked());
    assert_eq!(lock.read(|| 7), 7);
}
