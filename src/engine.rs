//! Engine Module
//!
//! The runtime that owns a data directory and coordinates all components.
//!
//! ## Responsibilities
//! - Lay out the data directory (store file + journal)
//! - Replay the journal into the maps on startup
//! - Hand out typed map handles
//! - Own the background commit job

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::buffer::Streamable;
use crate::concurrency::CommitJob;
use crate::config::Config;
use crate::error::Result;
use crate::factory::MapFactory;
use crate::skiplist::{DetachedSkipListMap, SkipListCore, SkipListMap};
use crate::types::Value;
use crate::wal::{Journal, Operation, WalEntry, WalRecovery, WriteAheadHook};

/// The main database engine
///
/// ## Write Path
/// map.put → map write lock → journal append → skip list update → store
///
/// ## Durability
/// Store writes reach the OS immediately; `commit` (run periodically by the
/// commit job) fsyncs the store and then truncates the journal, whose
/// entries are now redundant. After a crash the journal replays whatever the
/// last commit did not cover. A checkpoint waits for in-flight mutations to
/// reach the store, so it never truncates an entry whose write is not yet
/// covered by the commit.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Store file plus map directory
    factory: Arc<MapFactory>,

    /// Write-ahead journal (None when disabled)
    journal: Option<Arc<Journal>>,

    /// Periodic commit (None when the interval is 0)
    commit_job: Option<CommitJob>,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const DATA_FILENAME: &'static str = "data.tdb";
    const JOURNAL_FILENAME: &'static str = "journal.wal";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open the store and its map directory
    /// 3. Recover and replay the journal, commit, truncate it
    /// 4. Start the commit job
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;
        let data_path = config.data_dir.join(Self::DATA_FILENAME);
        let journal_path = config.data_dir.join(Self::JOURNAL_FILENAME);

        // Step 2: Open the store
        let mut factory =
            MapFactory::open(&data_path)?.with_default_load_factor(config.default_load_factor);

        // Step 3: Replay, make the replayed state durable, then start a fresh journal
        let journal = if config.journal_enabled {
            if journal_path.exists() {
                let (entries, result) = WalRecovery::recover(&journal_path)?;
                if !entries.is_empty() {
                    let applied = Self::replay(&factory, entries)?;
                    factory.commit()?;
                    info!(
                        applied,
                        corrupted = result.entries_corrupted,
                        last_lsn = result.last_lsn,
                        "replayed journal"
                    );
                }
            }

            let journal = Arc::new(Journal::open(&journal_path, config.wal_sync_strategy)?);
            journal.checkpoint(|| Ok(()))?;
            factory = factory.with_hook(Arc::clone(&journal) as Arc<dyn WriteAheadHook>);
            Some(journal)
        } else {
            None
        };
        let factory = Arc::new(factory);

        // Step 4: Background commit
        let commit_job = if config.commit_interval_ms > 0 {
            let factory = Arc::clone(&factory);
            let journal = journal.clone();
            Some(CommitJob::start(
                Duration::from_millis(config.commit_interval_ms),
                move || Self::checkpoint(&factory, journal.as_deref()),
            )?)
        } else {
            None
        };

        info!(data_dir = %config.data_dir.display(), "engine opened");
        Ok(Self {
            config,
            factory,
            journal,
            commit_job,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Apply journal entries to the maps they name; returns how many were applied
    fn replay(factory: &MapFactory, entries: Vec<WalEntry>) -> Result<usize> {
        let mut cores: HashMap<String, SkipListCore> = HashMap::new();
        let mut applied = 0;

        for entry in entries {
            let core = match cores.entry(entry.operation.map().to_string()) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    let core = factory.replay_core(slot.key())?;
                    slot.insert(core)
                }
            };

            match entry.operation {
                Operation::Put { key, value, .. } => {
                    core.put(&Value::from_bytes(&key)?, &value)?;
                }
                Operation::Remove { key, .. } => {
                    core.remove(&Value::from_bytes(&key)?)?;
                }
                Operation::Clear { .. } => core.clear()?,
            }
            applied += 1;
        }
        Ok(applied)
    }

    fn checkpoint(factory: &MapFactory, journal: Option<&Journal>) -> Result<()> {
        match journal {
            Some(journal) => journal.checkpoint(|| factory.commit()),
            None => factory.commit(),
        }
    }

    // =========================================================================
    // Maps
    // =========================================================================

    /// Locked map `name` (created with the configured load factor)
    pub fn map<V: Streamable>(&self, name: &str) -> Result<SkipListMap<V>> {
        self.factory.skip_list_map(name)
    }

    /// Locked map `name`, created with `load_factor` if it does not exist
    pub fn map_with_load_factor<V: Streamable>(
        &self,
        name: &str,
        load_factor: u8,
    ) -> Result<SkipListMap<V>> {
        self.factory.skip_list_map_with_load_factor(name, load_factor)
    }

    /// Lock-free handle on map `name`
    pub fn detached_map<V: Streamable>(&self, name: &str) -> Result<DetachedSkipListMap<V>> {
        self.factory.detached_map(name)
    }

    pub fn map_names(&self) -> Result<Vec<String>> {
        self.factory.map_names()
    }

    /// Flush the store and truncate the journal
    pub fn commit(&self) -> Result<()> {
        Self::checkpoint(&self.factory, self.journal.as_deref())
    }

    /// Close the engine gracefully
    ///
    /// Stops the commit job, commits, and closes the store
    pub fn close(mut self) -> Result<()> {
        if let Some(mut job) = self.commit_job.take() {
            job.stop();
        }
        self.commit()?;
        self.factory.close()?;
        info!(data_dir = %self.config.data_dir.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the store file
    pub fn data_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::DATA_FILENAME)
    }

    /// Path of the journal file
    pub fn journal_path(&self) -> PathBuf {
        self.config.data_dir.join(Self::JOURNAL_FILENAME)
    }

    /// LSN the next journal entry will receive (None when journaling is off)
    pub fn journal_lsn(&self) -> Option<u64> {
        self.journal.as_ref().map(|journal| journal.current_lsn())
    }

    pub fn factory(&self) -> &MapFactory {
        &self.factory
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
