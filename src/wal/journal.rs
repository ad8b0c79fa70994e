//! Journal hook
//!
//! The seam between the map engine and the WAL: maps call the hook before
//! every mutation, the journal turns the calls into WAL entries.

use std::fmt::Debug;
use std::path::Path;

use parking_lot::{Mutex, RwLock};

use super::{Operation, WalWriter};
use crate::config::WalSyncStrategy;
use crate::error::Result;

/// Called with the encoded key (and value) before a map mutation is applied
pub trait WriteAheadHook: Send + Sync + Debug {
    fn on_put(&self, map: &str, key: &[u8], value: &[u8]) -> Result<()>;

    fn on_remove(&self, map: &str, key: &[u8]) -> Result<()>;

    fn on_clear(&self, map: &str) -> Result<()>;

    /// Lock a mutation holds shared from its hook call until its store writes
    /// are done; checkpoints take it exclusively
    fn gate(&self) -> Option<&RwLock<()>> {
        None
    }
}

/// Write-ahead journal shared by every map of an engine
///
/// ## Concurrency:
/// - Appends from different maps serialize on the writer mutex
/// - A mutation holds the gate shared from its append until the store has
///   its bytes; `checkpoint` holds it exclusively, so it never truncates an
///   entry whose store write is still in flight
/// - `checkpoint` also holds the writer mutex across the store commit and
///   the truncate, so no append can slip in between them
pub struct Journal {
    writer: Mutex<WalWriter>,
    gate: RwLock<()>,
}

impl Journal {
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        Ok(Self {
            writer: Mutex::new(WalWriter::open(path, sync_strategy)?),
            gate: RwLock::new(()),
        })
    }

    /// Make the store durable with `commit`, then drop the journaled entries
    pub fn checkpoint<F>(&self, commit: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let _gate = self.gate.write();
        let mut writer = self.writer.lock();
        commit()?;
        writer.truncate()
    }

    pub fn sync(&self) -> Result<()> {
        self.writer.lock().sync()
    }

    /// LSN the next entry will receive
    pub fn current_lsn(&self) -> u64 {
        self.writer.lock().current_lsn()
    }

    fn append(&self, operation: Operation) -> Result<()> {
        self.writer.lock().append(operation).map(|_| ())
    }
}

impl WriteAheadHook for Journal {
    fn on_put(&self, map: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.append(Operation::Put {
            map: map.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    fn on_remove(&self, map: &str, key: &[u8]) -> Result<()> {
        self.append(Operation::Remove {
            map: map.to_string(),
            key: key.to_vec(),
        })
    }

    fn on_clear(&self, map: &str) -> Result<()> {
        self.append(Operation::Clear {
            map: map.to_string(),
        })
    }

    fn gate(&self) -> Option<&RwLock<()>> {
        Some(&self.gate)
    }
}

impl Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").finish_non_exhaustive()
    }
}
