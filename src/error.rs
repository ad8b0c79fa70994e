//! Error types for towerdb
//!
//! Provides a unified error type for all operations.
//!
//! Absence is never an error: lookups of missing keys and reads past the end of a
//! store come back as `Ok(None)`.

use thiserror::Error;

/// Result type alias using TowerError
pub type Result<T> = std::result::Result<T, TowerError>;

/// Unified error type for towerdb operations
#[derive(Debug, Error)]
pub enum TowerError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store is closed")]
    StoreClosed,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Structural corruption: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Buffer underflow: needed {needed} bytes, {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },

    #[error("Unknown type tag: 0x{0:02x}")]
    UnknownTypeTag(u8),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Attribute type mismatch on '{field}': expected {expected}, found {found}")]
    AttributeTypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for TowerError {
    fn from(err: bincode::Error) -> Self {
        TowerError::Serialization(err.to_string())
    }
}
