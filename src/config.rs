//! Configuration for towerdb
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, TowerError};

/// Smallest accepted load factor
pub const MIN_LOAD_FACTOR: u8 = 1;

/// Largest accepted load factor
pub const MAX_LOAD_FACTOR: u8 = 10;

/// Main configuration for a towerdb instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── data.tdb         (store holding every named map)
    ///     └── journal.wal      (write-ahead journal)
    pub data_dir: PathBuf,

    /// Load factor used when a map is opened without one (1..=10).
    /// Higher values allow taller skip list towers.
    pub default_load_factor: u8,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Whether map mutations are journaled before they are applied
    pub journal_enabled: bool,

    /// Sync strategy: how often to fsync the journal
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Commit Configuration
    // -------------------------------------------------------------------------
    /// Interval of the background commit job (milliseconds, 0 disables it)
    pub commit_interval_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./towerdb_data"),
            default_load_factor: 5,
            journal_enabled: true,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            commit_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values a builder cannot reject on its own
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LOAD_FACTOR..=MAX_LOAD_FACTOR).contains(&self.default_load_factor) {
            return Err(TowerError::Config(format!(
                "default_load_factor must be within {}..={}, got {}",
                MIN_LOAD_FACTOR, MAX_LOAD_FACTOR, self.default_load_factor
            )));
        }

        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(TowerError::Config(
                "EveryNEntries sync strategy needs a count above zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the load factor used for maps opened without one
    pub fn default_load_factor(mut self, load_factor: u8) -> Self {
        self.config.default_load_factor = load_factor;
        self
    }

    /// Enable or disable the write-ahead journal
    pub fn journal_enabled(mut self, enabled: bool) -> Self {
        self.config.journal_enabled = enabled;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the background commit interval (in milliseconds, 0 disables it)
    pub fn commit_interval_ms(mut self, ms: u64) -> Self {
        self.config.commit_interval_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
