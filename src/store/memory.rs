//! In-memory store

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{Result, TowerError};

use super::{check_write_range, in_range, Store, STORE_HEADER_SIZE};

/// Store kept in a heap buffer, with the same header layout as `FileStore`
///
/// Used for scratch maps and tests. Nothing survives the process.
pub struct MemoryStore {
    data: RwLock<Vec<u8>>,
    size: AtomicU64,
    open: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut data = vec![0u8; STORE_HEADER_SIZE as usize];
        data.copy_from_slice(&STORE_HEADER_SIZE.to_be_bytes());
        Self {
            data: RwLock::new(data),
            size: AtomicU64::new(STORE_HEADER_SIZE),
            open: AtomicBool::new(true),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TowerError::StoreClosed)
        }
    }

    /// Copy of the raw bytes, header included
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn path(&self) -> Option<&Path> {
        None
    }

    fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    fn allocate(&self, size: u64) -> Result<u64> {
        self.ensure_open()?;
        let position = self.size.fetch_add(size, Ordering::AcqRel);

        let mut data = self.data.write();
        let current = self.size.load(Ordering::Acquire);
        let needed = usize::try_from(current)
            .map_err(|_| TowerError::Storage(format!("memory store cannot grow to {} bytes", current)))?;
        if data.len() < needed {
            data.resize(needed, 0);
        }
        data[..STORE_HEADER_SIZE as usize].copy_from_slice(&current.to_be_bytes());
        Ok(position)
    }

    fn read(&self, position: u64, size: usize) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        if !in_range(position, size, self.size()) {
            return Ok(None);
        }

        let data = self.data.read();
        let start = position as usize;
        let mut buf = vec![0u8; size];
        // A concurrent allocate may have bumped the size before growing the buffer
        let available = data.len().saturating_sub(start).min(size);
        if available > 0 {
            buf[..available].copy_from_slice(&data[start..start + available]);
        }
        Ok(Some(Bytes::from(buf)))
    }

    fn write(&self, bytes: &[u8], position: u64) -> Result<usize> {
        self.ensure_open()?;
        check_write_range(position, bytes.len(), self.size())?;

        let mut data = self.data.write();
        let start = position as usize;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    fn commit(&self) -> Result<()> {
        self.ensure_open()
    }

    fn close(&self) -> Result<bool> {
        Ok(self.open.swap(false, Ordering::AcqRel))
    }

    fn delete(&self) -> Result<()> {
        self.open.store(false, Ordering::Release);
        let mut data = self.data.write();
        data.clear();
        data.shrink_to_fit();
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.ensure_open()?;
        let mut data = self.data.write();
        data.truncate(STORE_HEADER_SIZE as usize);
        data.copy_from_slice(&STORE_HEADER_SIZE.to_be_bytes());
        self.size.store(STORE_HEADER_SIZE, Ordering::Release);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("size", &self.size())
            .field("open", &self.is_open())
            .finish()
    }
}
