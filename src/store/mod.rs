//! Store Module
//!
//! Byte-addressable storage that the skip list uses as its arena. Every
//! node, key and record lives at a position (offset) handed out by
//! `allocate`, and every traversal resolves positions through the store.
//!
//! ## Responsibilities
//! - Hand out space with a monotonic, atomic allocation counter
//! - Persist the counter in an 8-byte header so the size survives restarts
//! - Read/write raw bytes, streamable objects and length-prefixed blocks
//! - Lifecycle: commit, close, delete, reset
//!
//! ## File Format
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────┐
//! │ Logical Size (8, BE) │ Application Data (positions 8..size)     │
//! └──────────────────────┴──────────────────────────────────────────┘
//!
//! Block (write_block / read_block):
//! ┌──────────┬──────────────┐
//! │ Len (4)  │    Data      │
//! └──────────┴──────────────┘
//! ```

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt::Debug;
use std::path::Path;

use bytes::Bytes;

use crate::buffer::{BufferStream, Streamable};
use crate::error::{Result, TowerError};

/// Size of the logical-size header at offset 0
pub const STORE_HEADER_SIZE: u64 = 8;

/// Size of the length prefix in front of every block
pub const BLOCK_PREFIX_SIZE: u64 = 4;

/// Growable, position-addressed byte storage
///
/// ## Invariants
/// - `size()` only grows, except through `reset()`
/// - A read succeeds only when `position + size <= self.size()`; anything
///   past that is `Ok(None)`, not an error
/// - Writes must land inside allocated space
pub trait Store: Send + Sync + Debug {
    /// Backing file, if any
    fn path(&self) -> Option<&Path>;

    /// Current logical size (header included)
    fn size(&self) -> u64;

    /// Reserve `size` bytes and return their position
    fn allocate(&self, size: u64) -> Result<u64>;

    /// Read exactly `size` bytes at `position`
    fn read(&self, position: u64, size: usize) -> Result<Option<Bytes>>;

    /// Write `bytes` at `position`, returning the number of bytes written
    fn write(&self, bytes: &[u8], position: u64) -> Result<usize>;

    /// Flush to the medium without closing
    fn commit(&self) -> Result<()>;

    /// Flush and release the handle; returns false if already closed
    fn close(&self) -> Result<bool>;

    /// Close and remove the backing storage
    fn delete(&self) -> Result<()>;

    /// Drop all data and start over with an empty header
    fn reset(&self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Reject a write that would land outside `[header, size)`
pub(crate) fn check_write_range(position: u64, len: usize, size: u64) -> Result<()> {
    let end = position.checked_add(len as u64);
    if position < STORE_HEADER_SIZE || end.map_or(true, |end| end > size) {
        return Err(TowerError::Storage(format!(
            "write of {} bytes at {} is outside the allocated range (size {})",
            len, position, size
        )));
    }
    Ok(())
}

/// Whether `[position, position + len)` lies inside the logical size
pub(crate) fn in_range(position: u64, len: usize, size: u64) -> bool {
    position
        .checked_add(len as u64)
        .map_or(false, |end| end <= size)
}

// =============================================================================
// Object and Block Helpers
// =============================================================================

/// Serialization helpers available on every store
pub trait StoreExt: Store {
    /// Read `size` bytes at `position` and decode them as `T`
    fn read_object<T: Streamable>(&self, position: u64, size: usize) -> Result<Option<T>> {
        match self.read(position, size)? {
            Some(bytes) => {
                let mut stream = BufferStream::from_bytes(&bytes);
                Ok(Some(T::read(&mut stream)?))
            }
            None => Ok(None),
        }
    }

    /// Decode the bytes at `position` into an existing instance; returns
    /// false (leaving `target` untouched) when the range is out of bounds
    fn read_into<T: Streamable>(&self, position: u64, size: usize, target: &mut T) -> Result<bool> {
        match self.read(position, size)? {
            Some(bytes) => {
                let mut stream = BufferStream::from_bytes(&bytes);
                target.read_into(&mut stream)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Encode `object` and write it at `position`
    fn write_object<T: Streamable>(&self, object: &T, position: u64) -> Result<usize> {
        let mut stream = BufferStream::pooled();
        object.write(&mut stream)?;
        self.write(stream.as_slice(), position)
    }

    /// Allocate a block for `bytes`, write it with its length prefix and
    /// return the block position
    fn write_block(&self, bytes: &[u8]) -> Result<u64> {
        let len = u32::try_from(bytes.len()).map_err(|_| {
            TowerError::Storage(format!("block of {} bytes is too large", bytes.len()))
        })?;
        let position = self.allocate(BLOCK_PREFIX_SIZE + bytes.len() as u64)?;

        let mut stream = BufferStream::pooled();
        stream.put_u32(len);
        stream.put_raw(bytes);
        self.write(stream.as_slice(), position)?;
        Ok(position)
    }

    /// Encode `object` into a new block
    fn append_object<T: Streamable>(&self, object: &T) -> Result<u64> {
        let mut stream = BufferStream::pooled();
        object.write(&mut stream)?;
        self.write_block(stream.as_slice())
    }

    /// Read the block at `position` (without its length prefix)
    fn read_block(&self, position: u64) -> Result<Option<Bytes>> {
        let Some(prefix) = self.read(position, BLOCK_PREFIX_SIZE as usize)? else {
            return Ok(None);
        };
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        match position.checked_add(BLOCK_PREFIX_SIZE) {
            Some(data) => self.read(data, len),
            None => Ok(None),
        }
    }

    /// Read the block at `position` and decode it as `T`
    fn read_block_object<T: Streamable>(&self, position: u64) -> Result<Option<T>> {
        match self.read_block(position)? {
            Some(bytes) => {
                let mut stream = BufferStream::from_bytes(&bytes);
                Ok(Some(T::read(&mut stream)?))
            }
            None => Ok(None),
        }
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
