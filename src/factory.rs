//! Map Factory
//!
//! Hosts any number of named maps inside one store.
//!
//! ## Responsibilities
//! - Keep the directory (map name → header position), itself a skip list
//!   whose header is the store's first allocation
//! - Create maps on first use, load them afterwards
//! - Share header and lock state between handles opened on the same name
//! - Translate load factors into tower heights
//!
//! ## Store Layout
//! ```text
//! ┌──────────┬─────────────────────┬──────────────────────────────────┐
//! │ Size (8) │ Directory Header    │ nodes, keys, records, map headers│
//! │          │ (at position 8)     │ ...                              │
//! └──────────┴─────────────────────┴──────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::Streamable;
use crate::concurrency::StampedLock;
use crate::config::{MAX_LOAD_FACTOR, MIN_LOAD_FACTOR};
use crate::error::{Result, TowerError};
use crate::skiplist::{DetachedSkipListMap, Header, SkipListCore, SkipListMap, MAX_LEVEL_LIMIT};
use crate::store::{FileStore, MemoryStore, Store, STORE_HEADER_SIZE};
use crate::types::Value;
use crate::wal::WriteAheadHook;

/// Load factor used by `skip_list_map` and `detached_map` unless configured
pub const DEFAULT_LOAD_FACTOR: u8 = 5;

/// Tower height limit of the directory map
const DIRECTORY_MAX_LEVEL: u8 = 16;

const DIRECTORY_NAME: &str = "__directory";

/// Tower height for a load factor: `4 + 3 * lf`, at most 32
pub fn max_level_for(load_factor: u8) -> u8 {
    let load_factor = load_factor.clamp(MIN_LOAD_FACTOR, MAX_LOAD_FACTOR);
    (4 + 3 * load_factor).min(MAX_LEVEL_LIMIT)
}

/// State shared by every handle on one map
#[derive(Clone)]
struct SharedMap {
    header: Arc<Header>,
    lock: Arc<StampedLock>,
}

/// Creates and opens named maps in one store
///
/// ## Concurrency:
/// - The directory and the handle cache are guarded by one mutex; opening
///   maps is rare, so this is the only coordination between map names
/// - Handles returned for the same name share one `StampedLock`
pub struct MapFactory {
    store: Arc<dyn Store>,
    directory: SkipListCore,
    maps: Mutex<HashMap<String, SharedMap>>,
    hook: Option<Arc<dyn WriteAheadHook>>,
    default_load_factor: u8,
}

impl MapFactory {
    /// Open (or create) a file store at `path` and its directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_store(Arc::new(FileStore::open(path)?))
    }

    /// Factory over a fresh in-memory store
    pub fn in_memory() -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Factory over an existing store
    pub fn with_store(store: Arc<dyn Store>) -> Result<Self> {
        let directory = Self::open_directory(&store)?;
        Ok(Self {
            store,
            directory,
            maps: Mutex::new(HashMap::new()),
            hook: None,
            default_load_factor: DEFAULT_LOAD_FACTOR,
        })
    }

    /// Journal every mutation of maps opened from now on
    pub fn with_hook(mut self, hook: Arc<dyn WriteAheadHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Load factor for maps opened without one
    pub fn with_default_load_factor(mut self, load_factor: u8) -> Self {
        self.default_load_factor = load_factor;
        self
    }

    fn open_directory(store: &Arc<dyn Store>) -> Result<SkipListCore> {
        let header = if store.size() == STORE_HEADER_SIZE {
            let header = Header::create(store.as_ref(), DIRECTORY_MAX_LEVEL)?;
            if header.position() != STORE_HEADER_SIZE {
                return Err(TowerError::Corruption(format!(
                    "directory header landed at {} instead of {}",
                    header.position(),
                    STORE_HEADER_SIZE
                )));
            }
            debug!("created map directory");
            header
        } else {
            Header::load(store.as_ref(), STORE_HEADER_SIZE)?
        };
        Ok(SkipListCore::new(
            DIRECTORY_NAME,
            Arc::clone(store),
            Arc::new(header),
            None,
        ))
    }

    // =========================================================================
    // Opening Maps
    // =========================================================================

    /// Locked map with the default load factor
    pub fn skip_list_map<V: Streamable>(&self, name: &str) -> Result<SkipListMap<V>> {
        self.skip_list_map_with_load_factor(name, self.default_load_factor)
    }

    /// Locked map; `load_factor` only matters when the map is created
    pub fn skip_list_map_with_load_factor<V: Streamable>(
        &self,
        name: &str,
        load_factor: u8,
    ) -> Result<SkipListMap<V>> {
        let shared = self.shared(name, load_factor)?;
        Ok(SkipListMap::new(self.core_for(name, &shared), shared.lock))
    }

    /// Lock-free map with the default load factor
    ///
    /// Never use a detached handle at the same time as another handle on
    /// the same name.
    pub fn detached_map<V: Streamable>(&self, name: &str) -> Result<DetachedSkipListMap<V>> {
        let shared = self.shared(name, self.default_load_factor)?;
        Ok(DetachedSkipListMap::new(self.core_for(name, &shared)))
    }

    /// Unjournaled engine for replaying the journal into `name`
    pub(crate) fn replay_core(&self, name: &str) -> Result<SkipListCore> {
        let shared = self.shared(name, self.default_load_factor)?;
        Ok(SkipListCore::new(
            name,
            Arc::clone(&self.store),
            shared.header,
            None,
        ))
    }

    fn core_for(&self, name: &str, shared: &SharedMap) -> SkipListCore {
        SkipListCore::new(
            name,
            Arc::clone(&self.store),
            Arc::clone(&shared.header),
            self.hook.clone(),
        )
    }

    fn shared(&self, name: &str, load_factor: u8) -> Result<SharedMap> {
        let mut maps = self.maps.lock();
        if let Some(shared) = maps.get(name) {
            return Ok(shared.clone());
        }

        let key = Value::from(name);
        let header = match self.directory.find(&key)? {
            Some(node) => {
                let position: u64 = self.directory.decode(&node)?.ok_or_else(|| {
                    TowerError::Corruption(format!("directory entry for {} is unreadable", name))
                })?;
                Header::load(self.store.as_ref(), position)?
            }
            None => {
                let header = Header::create(self.store.as_ref(), max_level_for(load_factor))?;
                self.directory
                    .put(&key, &header.position().to_be_bytes())?;
                debug!(map = name, max_level = header.max_level(), "created map");
                header
            }
        };

        let shared = SharedMap {
            header: Arc::new(header),
            lock: Arc::new(StampedLock::new()),
        };
        maps.insert(name.to_string(), shared.clone());
        Ok(shared)
    }

    // =========================================================================
    // Directory
    // =========================================================================

    /// Names of every map in the store, in order
    pub fn map_names(&self) -> Result<Vec<String>> {
        let _maps = self.maps.lock();
        let mut names = Vec::new();
        self.directory.scan(|node| {
            if let Value::Text(name) = node.key(self.store.as_ref())? {
                names.push(name);
            }
            Ok(true)
        })?;
        Ok(names)
    }

    pub fn contains_map(&self, name: &str) -> Result<bool> {
        let _maps = self.maps.lock();
        Ok(self.directory.find(&Value::from(name))?.is_some())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Flush the store
    pub fn commit(&self) -> Result<()> {
        self.store.commit()
    }

    /// Close the store; handles fail with `StoreClosed` afterwards
    pub fn close(&self) -> Result<bool> {
        self.store.close()
    }

    /// Wipe the store and start with an empty directory
    ///
    /// Handles opened before the reset must not be used afterwards.
    pub fn reset(&mut self) -> Result<()> {
        let mut maps = self.maps.lock();
        self.store.reset()?;
        maps.clear();
        drop(maps);
        self.directory = Self::open_directory(&self.store)?;
        Ok(())
    }
}

impl std::fmt::Debug for MapFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapFactory")
            .field("store", &self.store)
            .field("open_maps", &self.maps.lock().len())
            .finish()
    }
}
