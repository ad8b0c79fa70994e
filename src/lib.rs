//! # towerdb
//!
//! An embedded database engine built on a persistent, concurrent skip list:
//! - Ordered maps whose nodes, keys and values live in a single store file
//! - Typed values with a total order across types
//! - Fixed-slot records with single-attribute reads
//! - Optimistic reads with write locking per map
//! - Write-ahead journal replayed on open
//! - Query result cache keyed by record references
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │            (config, journal, background commit)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      MapFactory                              │
//! │             (directory of named skip lists)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Journal   │          │ SkipListMap │
//!   │  (Append)   │          │ (Stamped)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │    Store    │
//!                           │ (File/Mem)  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod buffer;
pub mod types;
pub mod record;
pub mod store;
pub mod skiplist;
pub mod concurrency;
pub mod factory;
pub mod wal;
pub mod cache;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TowerError};
pub use config::Config;
pub use engine::Engine;
pub use factory::MapFactory;
pub use skiplist::{DetachedSkipListMap, DiskMap, SkipListMap};
pub use store::{FileStore, MemoryStore, Store, StoreExt};
pub use types::{Reference, Value};
pub use record::{Entity, FieldType, RecordSchema};
pub use cache::QueryCache;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of towerdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
