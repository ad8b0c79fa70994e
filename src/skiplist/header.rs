//! Per-map header

use std::sync::atomic::{AtomicU64, Ordering};

use crate::buffer::{BufferStream, Streamable};
use crate::error::{Result, TowerError};
use crate::store::{Store, StoreExt};

use super::SkipNode;

/// Encoded size of a header
pub const HEADER_SIZE: usize = 25;

/// Tallest tower any map may grow
pub const MAX_LEVEL_LIMIT: u8 = 32;

/// Map metadata stored at a fixed position
///
/// ```text
/// ┌──────────────┬──────────────┬──────────────┬──────────────┐
/// │ TopHead (8)  │ BaseHead (8) │  Count (8)   │ MaxLevel (1) │
/// └──────────────┴──────────────┴──────────────┴──────────────┘
/// ```
///
/// Shared (through `Arc`) by every handle on the same map. The atomics are
/// only modified under the map's write lock; readers load them lock-free.
#[derive(Debug)]
pub struct Header {
    position: u64,
    /// Head node of the top level; searches start here
    first_node: AtomicU64,
    /// Head node of level 0; scans start here
    base_node: AtomicU64,
    record_count: AtomicU64,
    max_level: u8,
}

impl Header {
    /// Allocate a header plus a level 0 head
    pub fn create(store: &dyn Store, max_level: u8) -> Result<Self> {
        let position = store.allocate(HEADER_SIZE as u64)?;
        let head = SkipNode::create(store, 0)?;
        let header = Self {
            position,
            first_node: AtomicU64::new(head.position),
            base_node: AtomicU64::new(head.position),
            record_count: AtomicU64::new(0),
            max_level: max_level.clamp(1, MAX_LEVEL_LIMIT),
        };
        header.persist(store)?;
        Ok(header)
    }

    /// Load the header stored at `position`
    pub fn load(store: &dyn Store, position: u64) -> Result<Self> {
        let header: Header = store.read_object(position, HEADER_SIZE)?.ok_or_else(|| {
            TowerError::Corruption(format!("map header at {} lies beyond the store", position))
        })?;
        Ok(Self { position, ..header })
    }

    /// Write the current values back to the store
    pub fn persist(&self, store: &dyn Store) -> Result<()> {
        store.write_object(self, self.position)?;
        Ok(())
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn first_node(&self) -> u64 {
        self.first_node.load(Ordering::Acquire)
    }

    pub fn base_node(&self) -> u64 {
        self.base_node.load(Ordering::Acquire)
    }

    pub fn record_count(&self) -> u64 {
        self.record_count.load(Ordering::Acquire)
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    pub(crate) fn set_first_node(&self, position: u64) {
        self.first_node.store(position, Ordering::Release);
    }

    pub(crate) fn set_base_node(&self, position: u64) {
        self.base_node.store(position, Ordering::Release);
    }

    pub(crate) fn set_record_count(&self, count: u64) {
        self.record_count.store(count, Ordering::Release);
    }
}

impl Streamable for Header {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        buffer.put_u64(self.first_node());
        buffer.put_u64(self.base_node());
        buffer.put_u64(self.record_count());
        buffer.put_u8(self.max_level);
        Ok(())
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        Ok(Self {
            position: 0,
            first_node: AtomicU64::new(buffer.get_u64()?),
            base_node: AtomicU64::new(buffer.get_u64()?),
            record_count: AtomicU64::new(buffer.get_u64()?),
            max_level: buffer.get_u8()?,
        })
    }
}
