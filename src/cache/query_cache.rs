//! LRU + TTL query cache

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::Result;
use crate::types::Reference;

use super::{CachedResults, ChangeEvent};

/// Queries kept per cache
pub const DEFAULT_CAPACITY: usize = 100;

/// Lifetime of a cached result set
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct Entry {
    results: CachedResults,
    stored_at: Instant,
    /// Access tick, larger is more recent
    used: u64,
}

struct State<Q> {
    entries: HashMap<Q, Entry>,
    tick: u64,
}

/// Cache of query results keyed by query
///
/// ## Eviction:
/// - Inserting into a full cache drops the least recently used entry
/// - An entry older than the TTL is dropped when it is next looked up
///
/// ## Concurrency:
/// - One mutex around all entries; result sets are cloned out, never shared
pub struct QueryCache<Q> {
    state: Mutex<State<Q>>,
    capacity: usize,
    ttl: Duration,
}

impl<Q: Hash + Eq + Clone> QueryCache<Q> {
    /// Cache with the default capacity and TTL
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_TTL)
    }

    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                entries: HashMap::new(),
                tick: 0,
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// Cached results of `query`, if present and not expired
    pub fn get(&self, query: &Q) -> Option<CachedResults> {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        let expired = match state.entries.get_mut(query) {
            Some(entry) if entry.stored_at.elapsed() <= self.ttl => {
                entry.used = tick;
                return Some(entry.results.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            state.entries.remove(query);
        }
        None
    }

    /// Store results for `query`, evicting the least recently used entry
    /// when full
    pub fn put(&self, query: Q, results: CachedResults) {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        if !state.entries.contains_key(&query) && state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.used)
                .map(|(query, _)| query.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }

        state.entries.insert(
            query,
            Entry {
                results,
                stored_at: Instant::now(),
                used: tick,
            },
        );
    }

    /// Return cached results, or run `body`, cache and return its results
    pub fn cache<F>(&self, query: &Q, body: F) -> Result<CachedResults>
    where
        F: FnOnce() -> Result<HashSet<Reference>>,
    {
        if let Some(results) = self.get(query) {
            return Ok(results);
        }
        let results = CachedResults::new(body()?);
        self.put(query.clone(), results.clone());
        Ok(results)
    }

    /// Patch every cached result set after `reference` changed
    ///
    /// `matches` is asked, per cached query, whether the changed record
    /// satisfies it. It is not consulted for deletes.
    pub fn update_for_reference<F>(&self, reference: Reference, event: ChangeEvent, matches: F)
    where
        F: Fn(&Q) -> bool,
    {
        let mut state = self.state.lock();
        for (query, entry) in state.entries.iter_mut() {
            let hit = event != ChangeEvent::Delete && matches(query);
            entry.results.apply(reference, event, hit);
        }
    }

    /// Drop the entry for `query`
    pub fn invalidate(&self, query: &Q) -> bool {
        self.state.lock().entries.remove(query).is_some()
    }

    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<Q: Hash + Eq + Clone> Default for QueryCache<Q> {
    fn default() -> Self {
        Self::new()
    }
}
