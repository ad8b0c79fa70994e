//! Stamped read/write lock

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Single-writer lock with an optimistic read path
///
/// ## Concurrency:
/// - Writers exclude each other and all pessimistic readers
/// - Pessimistic readers run in parallel
/// - The stamp is odd exactly while a writer holds the lock. An optimistic
///   reader runs without locking, then checks the stamp did not move; if it
///   did (or was odd to begin with) the read is redone under the read lock
/// - Optimistic bodies must tolerate running against a structure that is
///   being modified: their result is discarded unless the stamp validates
pub struct StampedLock {
    lock: RwLock<()>,
    stamp: AtomicU64,
}

/// Moves the stamp back to even when the write section ends (also on panic)
struct StampRelease<'a>(&'a AtomicU64);

impl Drop for StampRelease<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Release);
    }
}

impl StampedLock {
    pub fn new() -> Self {
        Self {
            lock: RwLock::new(()),
            stamp: AtomicU64::new(0),
        }
    }

    /// Run `f` exclusively
    pub fn write<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock.write();
        self.stamp.fetch_add(1, Ordering::AcqRel);
        let _release = StampRelease(&self.stamp);
        f()
    }

    /// Run `f` under the shared read lock
    pub fn read<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock.read();
        f()
    }

    /// Run `f` without locking and keep the result only if no writer
    /// interfered; otherwise run it again under the read lock
    pub fn optimistic_read<R>(&self, f: impl Fn() -> R) -> R {
        let stamp = self.stamp();
        if stamp % 2 == 0 {
            let result = f();
            if self.validate(stamp) {
                return result;
            }
        }
        self.read(f)
    }

    /// Current stamp
    pub fn stamp(&self) -> u64 {
        self.stamp.load(Ordering::Acquire)
    }

    /// Whether no write started or finished since `stamp` was taken
    pub fn validate(&self, stamp: u64) -> bool {
        stamp % 2 == 0 && self.stamp.load(Ordering::Acquire) == stamp
    }

    pub fn is_write_locked(&self) -> bool {
        self.stamp() % 2 == 1
    }
}

impl Default for StampedLock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StampedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StampedLock")
            .field("stamp", &self.stamp())
            .finish()
    }
}
