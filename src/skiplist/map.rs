//! Typed maps
//!
//! `SkipListMap` (locked) and `DetachedSkipListMap` (lock-free) expose the
//! same `DiskMap` operations; the variant is chosen when the map is opened.

use std::cell::Cell;
use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::warn;

use crate::buffer::{BufferStream, Streamable};
use crate::concurrency::StampedLock;
use crate::error::Result;
use crate::record::{decode_record, read_attribute, Entity};
use crate::store::{StoreExt, BLOCK_PREFIX_SIZE};
use crate::types::{Reference, Value};

use super::SkipListCore;

/// Ordered, persistent map operations
///
/// Keys are anything convertible into a [`Value`] and are ordered by
/// force compare, so `Int(5)` and `Long(5)` name the same entry. Range scans
/// and record ids are node positions, usable as [`Reference`] positions.
pub trait DiskMap<V: Streamable> {
    /// Name the map is registered under
    fn name(&self) -> &str;

    /// Value stored under `key`
    fn get<K: Into<Value>>(&self, key: K) -> Result<Option<V>>;

    /// Insert or overwrite; returns the previous value
    fn put<K: Into<Value>>(&self, key: K, value: V) -> Result<Option<V>>;

    /// Remove `key`; returns the removed value
    fn remove<K: Into<Value>>(&self, key: K) -> Result<Option<V>>;

    fn contains_key<K: Into<Value>>(&self, key: K) -> Result<bool>;

    /// Record id (level 0 node position) of `key`
    fn get_rec_id<K: Into<Value>>(&self, key: K) -> Result<Option<u64>>;

    /// Value of the record with the given id
    fn get_with_rec_id(&self, position: u64) -> Result<Option<V>>;

    /// Attributes of the record with the given id, by field name
    fn get_map_with_rec_id(&self, position: u64) -> Result<Option<BTreeMap<String, Value>>>
    where
        V: Entity;

    /// One attribute of the record with the given id, without decoding the
    /// rest of the record
    fn get_attribute_with_rec_id(&self, field: &str, position: u64) -> Result<Option<Value>>
    where
        V: Entity;

    /// Record ids with key > `key` (>= with `include_equal`)
    fn above<K: Into<Value>>(&self, key: K, include_equal: bool) -> Result<HashSet<u64>>;

    /// Record ids with key < `key` (<= with `include_equal`)
    fn below<K: Into<Value>>(&self, key: K, include_equal: bool) -> Result<HashSet<u64>>;

    /// Number of entries (from the persisted count)
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry; the space is not reclaimed
    fn clear(&self) -> Result<()>;

    /// Linear scan for `value`
    fn contains_value(&self, value: &V) -> Result<bool>
    where
        V: PartialEq;

    /// Keys in order
    fn keys(&self) -> Result<Vec<Value>>;

    /// Values in key order
    fn values(&self) -> Result<Vec<V>>;

    /// Entries in key order
    fn entries(&self) -> Result<Vec<(Value, V)>>;

    /// References to every record, in key order
    fn references(&self, partition: i64) -> Result<Vec<Reference>>;

    fn first_key(&self) -> Result<Option<Value>>;

    fn last_key(&self) -> Result<Option<Value>>;

    fn put_all<K, I>(&self, entries: I) -> Result<()>
    where
        K: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }
}

// =============================================================================
// Shared Operations
// =============================================================================

fn encode<V: Streamable>(value: &V) -> Result<Vec<u8>> {
    let mut stream = BufferStream::pooled();
    value.write(&mut stream)?;
    Ok(stream.to_vec())
}

fn get<V: Streamable>(core: &SkipListCore, key: &Value) -> Result<Option<V>> {
    match core.find(key)? {
        Some(node) => core.decode(&node),
        None => Ok(None),
    }
}

fn put<V: Streamable>(core: &SkipListCore, key: &Value, value: &V) -> Result<Option<V>> {
    let bytes = encode(value)?;
    match core.put(key, &bytes)? {
        Some(previous) => previous_value(core, previous),
        None => Ok(None),
    }
}

fn remove<V: Streamable>(core: &SkipListCore, key: &Value) -> Result<Option<V>> {
    match core.remove(key)? {
        Some(record) => previous_value(core, record),
        None => Ok(None),
    }
}

/// Decode a record that is no longer linked (its bytes stay in the store)
fn previous_value<V: Streamable>(core: &SkipListCore, record: u64) -> Result<Option<V>> {
    core.store().read_block_object(record)
}

fn rec_id(core: &SkipListCore, key: &Value) -> Result<Option<u64>> {
    Ok(core.find(key)?.map(|node| node.position))
}

fn with_rec_id<V: Streamable>(core: &SkipListCore, position: u64) -> Result<Option<V>> {
    match core.record_node(position)? {
        Some(node) => core.decode(&node),
        None => Ok(None),
    }
}

fn map_with_rec_id<V: Entity>(core: &SkipListCore, position: u64) -> Result<Option<BTreeMap<String, Value>>> {
    let Some(node) = core.record_node(position)? else {
        return Ok(None);
    };
    let Some(bytes) = core.record_bytes(&node)? else {
        return Ok(None);
    };

    let schema = V::schema();
    let mut stream = BufferStream::from_bytes(&bytes);
    let values = decode_record(schema, &mut stream)?;
    Ok(Some(
        schema
            .fields()
            .iter()
            .map(|field| field.name.clone())
            .zip(values)
            .collect(),
    ))
}

fn attribute_with_rec_id<V: Entity>(core: &SkipListCore, field: &str, position: u64) -> Result<Option<Value>> {
    let field = V::schema().field(field)?;
    let Some(node) = core.record_node(position)? else {
        return Ok(None);
    };

    let value = match node.record.checked_add(BLOCK_PREFIX_SIZE) {
        Some(body) => read_attribute(core.store(), body, field)?,
        None => None,
    };
    if value.is_none() {
        warn!(map = core.name(), record = node.record, "record attribute beyond the store");
    }
    Ok(value)
}

fn contains_value<V: Streamable + PartialEq>(core: &SkipListCore, value: &V) -> Result<bool> {
    let mut found = false;
    core.scan(|node| {
        if let Some(stored) = core.decode::<V>(node)? {
            found = stored == *value;
        }
        Ok(!found)
    })?;
    Ok(found)
}

fn keys(core: &SkipListCore) -> Result<Vec<Value>> {
    let mut keys = Vec::new();
    core.scan(|node| {
        keys.push(node.key(core.store())?);
        Ok(true)
    })?;
    Ok(keys)
}

fn values<V: Streamable>(core: &SkipListCore) -> Result<Vec<V>> {
    let mut values = Vec::new();
    core.scan(|node| {
        if let Some(value) = core.decode(node)? {
            values.push(value);
        }
        Ok(true)
    })?;
    Ok(values)
}

fn entries<V: Streamable>(core: &SkipListCore) -> Result<Vec<(Value, V)>> {
    let mut entries = Vec::new();
    core.scan(|node| {
        if let Some(value) = core.decode(node)? {
            entries.push((node.key(core.store())?, value));
        }
        Ok(true)
    })?;
    Ok(entries)
}

fn references(core: &SkipListCore, partition: i64) -> Result<Vec<Reference>> {
    let mut references = Vec::new();
    core.scan(|node| {
        references.push(Reference::new(partition, node.position));
        Ok(true)
    })?;
    Ok(references)
}

fn first_key(core: &SkipListCore) -> Result<Option<Value>> {
    core.first()?.map(|node| node.key(core.store())).transpose()
}

fn last_key(core: &SkipListCore) -> Result<Option<Value>> {
    core.last()?.map(|node| node.key(core.store())).transpose()
}

// =============================================================================
// Locked Map
// =============================================================================

/// Map shared between threads
///
/// ## Concurrency:
/// - put / remove / clear: exclusive write lock
/// - above / below / contains_value / iteration: shared read lock
/// - get / get_rec_id / *_with_rec_id: optimistic read, redone under the
///   read lock when a writer interfered
///
/// Handles opened on the same name share the lock, so they exclude each
/// other as one map.
pub struct SkipListMap<V> {
    core: SkipListCore,
    lock: Arc<StampedLock>,
    _value: PhantomData<fn() -> V>,
}

impl<V: Streamable> SkipListMap<V> {
    pub(crate) fn new(core: SkipListCore, lock: Arc<StampedLock>) -> Self {
        Self {
            core,
            lock,
            _value: PhantomData,
        }
    }

    /// Tallest tower this map may build
    pub fn max_level(&self) -> u8 {
        self.core.header().max_level()
    }
}

impl<V> Clone for SkipListMap<V> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            lock: Arc::clone(&self.lock),
            _value: PhantomData,
        }
    }
}

impl<V> std::fmt::Debug for SkipListMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipListMap")
            .field("core", &self.core)
            .field("lock", &self.lock)
            .finish()
    }
}

impl<V: Streamable> DiskMap<V> for SkipListMap<V> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn get<K: Into<Value>>(&self, key: K) -> Result<Option<V>> {
        let key = key.into();
        self.lock.optimistic_read(|| get(&self.core, &key))
    }

    fn put<K: Into<Value>>(&self, key: K, value: V) -> Result<Option<V>> {
        let key = key.into();
        self.lock.write(|| put(&self.core, &key, &value))
    }

    fn remove<K: Into<Value>>(&self, key: K) -> Result<Option<V>> {
        let key = key.into();
        self.lock.write(|| remove(&self.core, &key))
    }

    fn contains_key<K: Into<Value>>(&self, key: K) -> Result<bool> {
        let key = key.into();
        self.lock
            .optimistic_read(|| Ok(self.core.find(&key)?.is_some()))
    }

    fn get_rec_id<K: Into<Value>>(&self, key: K) -> Result<Option<u64>> {
        let key = key.into();
        self.lock.optimistic_read(|| rec_id(&self.core, &key))
    }

    fn get_with_rec_id(&self, position: u64) -> Result<Option<V>> {
        self.lock
            .optimistic_read(|| with_rec_id(&self.core, position))
    }

    fn get_map_with_rec_id(&self, position: u64) -> Result<Option<BTreeMap<String, Value>>>
    where
        V: Entity,
    {
        self.lock
            .optimistic_read(|| map_with_rec_id::<V>(&self.core, position))
    }

    fn get_attribute_with_rec_id(&self, field: &str, position: u64) -> Result<Option<Value>>
    where
        V: Entity,
    {
        self.lock
            .optimistic_read(|| attribute_with_rec_id::<V>(&self.core, field, position))
    }

    fn above<K: Into<Value>>(&self, key: K, include_equal: bool) -> Result<HashSet<u64>> {
        let key = key.into();
        self.lock.read(|| self.core.above(&key, include_equal))
    }

    fn below<K: Into<Value>>(&self, key: K, include_equal: bool) -> Result<HashSet<u64>> {
        let key = key.into();
        self.lock.read(|| self.core.below(&key, include_equal))
    }

    fn len(&self) -> u64 {
        self.core.len()
    }

    fn clear(&self) -> Result<()> {
        self.lock.write(|| self.core.clear())
    }

    fn contains_value(&self, value: &V) -> Result<bool>
    where
        V: PartialEq,
    {
        self.lock.read(|| contains_value(&self.core, value))
    }

    fn keys(&self) -> Result<Vec<Value>> {
        self.lock.read(|| keys(&self.core))
    }

    fn values(&self) -> Result<Vec<V>> {
        self.lock.read(|| values(&self.core))
    }

    fn entries(&self) -> Result<Vec<(Value, V)>> {
        self.lock.read(|| entries(&self.core))
    }

    fn references(&self, partition: i64) -> Result<Vec<Reference>> {
        self.lock.read(|| references(&self.core, partition))
    }

    fn first_key(&self) -> Result<Option<Value>> {
        self.lock.read(|| first_key(&self.core))
    }

    fn last_key(&self) -> Result<Option<Value>> {
        self.lock.read(|| last_key(&self.core))
    }

    fn put_all<K, I>(&self, entries: I) -> Result<()>
    where
        K: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.lock.write(|| {
            for (key, value) in entries {
                put(&self.core, &key.into(), &value)?;
            }
            Ok(())
        })
    }
}

// =============================================================================
// Detached Map
// =============================================================================

/// Lock-free map for single-threaded use
///
/// Not `Sync`: a detached map cannot be shared between threads, which is
/// what makes skipping the lock sound. It may still be moved to another
/// thread.
pub struct DetachedSkipListMap<V> {
    core: SkipListCore,
    _value: PhantomData<(fn() -> V, Cell<()>)>,
}

impl<V: Streamable> DetachedSkipListMap<V> {
    pub(crate) fn new(core: SkipListCore) -> Self {
        Self {
            core,
            _value: PhantomData,
        }
    }

    pub fn max_level(&self) -> u8 {
        self.core.header().max_level()
    }
}

impl<V> std::fmt::Debug for DetachedSkipListMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetachedSkipListMap")
            .field("core", &self.core)
            .finish()
    }
}

impl<V: Streamable> DiskMap<V> for DetachedSkipListMap<V> {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn get<K: Into<Value>>(&self, key: K) -> Result<Option<V>> {
        get(&self.core, &key.into())
    }

    fn put<K: Into<Value>>(&self, key: K, value: V) -> Result<Option<V>> {
        put(&self.core, &key.into(), &value)
    }

    fn remove<K: Into<Value>>(&self, key: K) -> Result<Option<V>> {
        remove(&self.core, &key.into())
    }

    fn contains_key<K: Into<Value>>(&self, key: K) -> Result<bool> {
        Ok(self.core.find(&key.into())?.is_some())
    }

    fn get_rec_id<K: Into<Value>>(&self, key: K) -> Result<Option<u64>> {
        rec_id(&self.core, &key.into())
    }

    fn get_with_rec_id(&self, position: u64) -> Result<Option<V>> {
        with_rec_id(&self.core, position)
    }

    fn get_map_with_rec_id(&self, position: u64) -> Result<Option<BTreeMap<String, Value>>>
    where
        V: Entity,
    {
        map_with_rec_id::<V>(&self.core, position)
    }

    fn get_attribute_with_rec_id(&self, field: &str, position: u64) -> Result<Option<Value>>
    where
        V: Entity,
    {
        attribute_with_rec_id::<V>(&self.core, field, position)
    }

    fn above<K: Into<Value>>(&self, key: K, include_equal: bool) -> Result<HashSet<u64>> {
        self.core.above(&key.into(), include_equal)
    }

    fn below<K: Into<Value>>(&self, key: K, include_equal: bool) -> Result<HashSet<u64>> {
        self.core.below(&key.into(), include_equal)
    }

    fn len(&self) -> u64 {
        self.core.len()
    }

    fn clear(&self) -> Result<()> {
        self.core.clear()
    }

    fn contains_value(&self, value: &V) -> Result<bool>
    where
        V: PartialEq,
    {
        contains_value(&self.core, value)
    }

    fn keys(&self) -> Result<Vec<Value>> {
        keys(&self.core)
    }

    fn values(&self) -> Result<Vec<V>> {
        values(&self.core)
    }

    fn entries(&self) -> Result<Vec<(Value, V)>> {
        entries(&self.core)
    }

    fn references(&self, partition: i64) -> Result<Vec<Reference>> {
        references(&self.core, partition)
    }

    fn first_key(&self) -> Result<Option<Value>> {
        first_key(&self.core)
    }

    fn last_key(&self) -> Result<Option<Value>> {
        last_key(&self.core)
    }
}
