//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TowerError};

/// LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Map mutations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Insert or overwrite `key` in `map`
    Put {
        map: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },

    /// Remove `key` from `map`
    Remove { map: String, key: Vec<u8> },

    /// Drop every entry of `map`
    Clear { map: String },
}

impl Operation {
    /// Name of the map the operation targets
    pub fn map(&self) -> &str {
        match self {
            Operation::Put { map, .. } | Operation::Remove { map, .. } | Operation::Clear { map } => map,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode as header + data
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        let len = u32::try_from(data.len())
            .map_err(|_| TowerError::WalWrite(format!("entry of {} bytes is too large", data.len())))?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + data.len());
        bytes.extend_from_slice(&self.lsn.to_be_bytes());
        bytes.extend_from_slice(&crc32fast::hash(&data).to_be_bytes());
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Decode one entry from the front of `bytes`, verifying its checksum
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(TowerError::WalCorruption(format!(
                "entry header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let (lsn, crc, len) = parse_header(bytes);
        let data = bytes.get(HEADER_SIZE..HEADER_SIZE + len).ok_or_else(|| {
            TowerError::WalCorruption(format!(
                "entry {} declares {} data bytes, only {} present",
                lsn,
                len,
                bytes.len() - HEADER_SIZE
            ))
        })?;

        let actual = crc32fast::hash(data);
        if actual != crc {
            return Err(TowerError::WalCorruption(format!(
                "CRC mismatch for entry {}: expected {:08x}, got {:08x}",
                lsn, crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| TowerError::WalCorruption(format!("undecodable entry {}: {}", lsn, e)))?;
        if entry.lsn != lsn {
            return Err(TowerError::WalCorruption(format!(
                "header LSN {} does not match entry LSN {}",
                lsn, entry.lsn
            )));
        }
        Ok(entry)
    }

    /// Total encoded size (header included)
    pub fn serialized_size(&self) -> Result<usize> {
        Ok(HEADER_SIZE + bincode::serialized_size(self)? as usize)
    }

    /// Checksum of the encoded data section
    pub fn compute_crc(&self) -> Result<u32> {
        let data = bincode::serialize(self)?;
        Ok(crc32fast::hash(&data))
    }
}

/// Split a header into (lsn, crc, data length); `bytes` must hold a full header
pub(super) fn parse_header(bytes: &[u8]) -> (u64, u32, usize) {
    let mut lsn = [0u8; 8];
    let mut crc = [0u8; 4];
    let mut len = [0u8; 4];
    lsn.copy_from_slice(&bytes[0..8]);
    crc.copy_from_slice(&bytes[8..12]);
    len.copy_from_slice(&bytes[12..16]);
    (
        u64::from_be_bytes(lsn),
        u32::from_be_bytes(crc),
        u32::from_be_bytes(len) as usize,
    )
}
