//! Skip list engine
//!
//! The algorithms over nodes, without any locking. `SkipListMap` and
//! `DetachedSkipListMap` wrap a `SkipListCore` with their lock discipline.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLockReadGuard;
use rand::Rng;
use tracing::{debug, warn};

use crate::buffer::{BufferStream, Streamable};
use crate::error::{Result, TowerError};
use crate::store::{in_range, Store, StoreExt, STORE_HEADER_SIZE};
use crate::types::Value;
use crate::wal::WriteAheadHook;

use super::node::NODE_SIZE;
use super::{Header, SkipNode};

/// Lock-free skip list engine over a store
///
/// Writes must be serialized by the caller. Reads may run concurrently with
/// each other; a read racing a write may see a stale or partial structure
/// and must be validated (or run under a read lock) by the caller.
#[derive(Clone)]
pub(crate) struct SkipListCore {
    name: Arc<str>,
    store: Arc<dyn Store>,
    header: Arc<Header>,
    hook: Option<Arc<dyn WriteAheadHook>>,
}

impl SkipListCore {
    pub(crate) fn new(
        name: &str,
        store: Arc<dyn Store>,
        header: Arc<Header>,
        hook: Option<Arc<dyn WriteAheadHook>>,
    ) -> Self {
        Self {
            name: Arc::from(name),
            store,
            header,
            hook,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn header(&self) -> &Header {
        &self.header
    }

    pub(crate) fn len(&self) -> u64 {
        self.header.record_count()
    }

    // =========================================================================
    // Node Access
    // =========================================================================

    /// Load a node, reporting pointers that lead outside the store
    pub(crate) fn node_at(&self, position: u64) -> Result<Option<SkipNode>> {
        if position < STORE_HEADER_SIZE {
            warn!(map = %self.name, position, "node pointer into the store header");
            return Ok(None);
        }
        let node = SkipNode::read(self.store(), position)?;
        if node.is_none() {
            warn!(
                map = %self.name,
                position,
                size = self.store.size(),
                "node pointer beyond the store"
            );
        }
        Ok(node)
    }

    /// Load a level 0 record node by position (a record id)
    pub(crate) fn record_node(&self, position: u64) -> Result<Option<SkipNode>> {
        if position < STORE_HEADER_SIZE || !in_range(position, NODE_SIZE, self.store.size()) {
            warn!(map = %self.name, position, "record id outside the store");
            return Ok(None);
        }
        Ok(self
            .node_at(position)?
            .filter(|node| node.level == 0 && node.is_record()))
    }

    fn top_head(&self) -> Result<Option<SkipNode>> {
        self.node_at(self.header.first_node())
    }

    fn base_head(&self) -> Result<Option<SkipNode>> {
        self.node_at(self.header.base_node())
    }

    /// Raw value bytes of a record node
    pub(crate) fn record_bytes(&self, node: &SkipNode) -> Result<Option<Bytes>> {
        let bytes = self.store.read_block(node.record)?;
        if bytes.is_none() {
            warn!(map = %self.name, node = node.position, record = node.record, "record beyond the store");
        }
        Ok(bytes)
    }

    /// Decode the value of a record node
    pub(crate) fn decode<V: Streamable>(&self, node: &SkipNode) -> Result<Option<V>> {
        match self.record_bytes(node)? {
            Some(bytes) => {
                let mut stream = BufferStream::from_bytes(&bytes);
                Ok(Some(V::read(&mut stream)?))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Predecessor of `key` on every level, indexed by level
    ///
    /// Each entry is the last node at that level whose key is below `key`
    /// (a head node when there is none).
    pub(crate) fn search(&self, key: &Value) -> Result<Vec<SkipNode>> {
        let mut path = Vec::new();
        let Some(mut current) = self.top_head()? else {
            return Ok(path);
        };

        loop {
            while current.right != 0 {
                let Some(next) = self.node_at(current.right)? else {
                    break;
                };
                if next.key(self.store())?.force_compare(key).is_lt() {
                    current = next;
                } else {
                    break;
                }
            }
            path.push(current);
            if current.down == 0 {
                break;
            }
            match self.node_at(current.down)? {
                Some(down) => current = down,
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    /// Level 0 node holding `key`
    ///
    /// Goes right while the next key is smaller, down otherwise, and drops
    /// straight down the tower as soon as an equal key shows up.
    pub(crate) fn find(&self, key: &Value) -> Result<Option<SkipNode>> {
        let Some(mut current) = self.top_head()? else {
            return Ok(None);
        };

        loop {
            while current.right != 0 {
                let Some(next) = self.node_at(current.right)? else {
                    break;
                };
                match next.key(self.store())?.force_compare(key) {
                    std::cmp::Ordering::Less => current = next,
                    std::cmp::Ordering::Equal => return self.descend(next),
                    std::cmp::Ordering::Greater => break,
                }
            }
            if current.down == 0 {
                return Ok(None);
            }
            match self.node_at(current.down)? {
                Some(down) => current = down,
                None => return Ok(None),
            }
        }
    }

    fn descend(&self, mut node: SkipNode) -> Result<Option<SkipNode>> {
        while node.down != 0 {
            match self.node_at(node.down)? {
                Some(down) => node = down,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    /// Level 0 predecessor of `key`
    pub(crate) fn nearest(&self, key: &Value) -> Result<Option<SkipNode>> {
        Ok(self.search(key)?.into_iter().next())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Hold off journal checkpoints until this mutation reached the store
    fn enter(&self) -> Option<RwLockReadGuard<'_, ()>> {
        self.hook
            .as_ref()
            .and_then(|hook| hook.gate())
            .map(|gate| gate.read())
    }

    /// Insert or overwrite; returns the previous record position
    pub(crate) fn put(&self, key: &Value, value: &[u8]) -> Result<Option<u64>> {
        let key_bytes = key.to_bytes()?;
        let _gate = self.enter();
        if let Some(hook) = &self.hook {
            hook.on_put(&self.name, &key_bytes, value)?;
        }

        let mut path = self.search(key)?;
        if path.is_empty() {
            return Err(TowerError::Corruption(format!(
                "map {} has no reachable head",
                self.name
            )));
        }

        // Existing key: swap the record pointer, the old payload stays behind
        if path[0].right != 0 {
            if let Some(mut next) = self.node_at(path[0].right)? {
                if next.key(self.store())?.force_eq(key) {
                    let previous = next.record;
                    next.record = self.store.write_block(value)?;
                    next.write(self.store())?;
                    return Ok(Some(previous));
                }
            }
        }

        let level = self.random_level();
        self.grow_head(&mut path, level)?;

        let key_position = self.store.write_block(&key_bytes)?;
        let record = self.store.write_block(value)?;

        let mut below: Option<SkipNode> = None;
        for lvl in 0..=level as usize {
            let mut node = SkipNode::allocate(self.store(), key_position, lvl as u8)?;
            let pred = &mut path[lvl];
            node.left = pred.position;
            node.right = pred.right;
            if lvl == 0 {
                node.record = record;
            }
            if let Some(mut under) = below {
                node.down = under.position;
                under.up = node.position;
                under.write(self.store())?;
            }
            node.write(self.store())?;

            if pred.right != 0 {
                if let Some(mut right) = self.node_at(pred.right)? {
                    right.left = node.position;
                    right.write(self.store())?;
                }
            }
            pred.right = node.position;
            pred.write(self.store())?;

            below = Some(node);
        }

        self.header.set_record_count(self.header.record_count() + 1);
        self.header.persist(self.store())?;
        Ok(None)
    }

    /// Add head levels until the head tower reaches `level`
    fn grow_head(&self, path: &mut Vec<SkipNode>, level: u8) -> Result<()> {
        let start = path.len();
        if (level as usize) < start {
            return Ok(());
        }
        let Some(mut under) = self.top_head()? else {
            return Ok(());
        };

        for lvl in start..=level as usize {
            let mut head = SkipNode::create(self.store(), lvl as u8)?;
            head.down = under.position;
            under.up = head.position;
            under.write(self.store())?;
            // The old top head may also be the predecessor recorded in the path
            if let Some(entry) = path.iter_mut().find(|n| n.position == under.position) {
                entry.up = under.up;
            }
            head.write(self.store())?;
            path.push(head);
            under = head;
        }

        self.header.set_first_node(under.position);
        self.header.persist(self.store())?;
        debug!(map = %self.name, level, "grew head tower");
        Ok(())
    }

    /// Unsplice the tower of `key`; returns the removed record position
    pub(crate) fn remove(&self, key: &Value) -> Result<Option<u64>> {
        let key_bytes = key.to_bytes()?;
        let _gate = self.enter();
        if let Some(hook) = &self.hook {
            hook.on_remove(&self.name, &key_bytes)?;
        }

        let Some(target) = self.find(key)? else {
            return Ok(None);
        };
        let record = target.record;

        let mut current = Some(target);
        while let Some(node) = current {
            if let Some(mut left) = self.node_at(node.left)? {
                left.right = node.right;
                left.write(self.store())?;
            }
            if node.right != 0 {
                if let Some(mut right) = self.node_at(node.right)? {
                    right.left = node.left;
                    right.write(self.store())?;
                }
            }
            current = if node.up != 0 {
                self.node_at(node.up)?
            } else {
                None
            };
        }

        self.shrink_head()?;
        self.header
            .set_record_count(self.header.record_count().saturating_sub(1));
        self.header.persist(self.store())?;
        Ok(Some(record))
    }

    /// Drop empty head levels from the top (level 0 always stays)
    fn shrink_head(&self) -> Result<()> {
        let Some(mut top) = self.top_head()? else {
            return Ok(());
        };
        let initial = top.position;

        while top.level > 0 && top.right == 0 {
            let Some(mut down) = self.node_at(top.down)? else {
                break;
            };
            down.up = 0;
            down.write(self.store())?;
            top = down;
        }

        if top.position != initial {
            self.header.set_first_node(top.position);
        }
        Ok(())
    }

    /// Start over with a fresh head; the old graph is left in place
    pub(crate) fn clear(&self) -> Result<()> {
        let _gate = self.enter();
        if let Some(hook) = &self.hook {
            hook.on_clear(&self.name)?;
        }

        let head = SkipNode::create(self.store(), 0)?;
        self.header.set_first_node(head.position);
        self.header.set_base_node(head.position);
        self.header.set_record_count(0);
        self.header.persist(self.store())
    }

    /// Geometric level with p = 0.5, below the map's max level
    fn random_level(&self) -> u8 {
        let mut rng = rand::thread_rng();
        let mut level = 0u8;
        while level + 1 < self.header.max_level() && rng.gen_bool(0.5) {
            level += 1;
        }
        level
    }

    // =========================================================================
    // Range Scans
    // =========================================================================

    /// Positions of record nodes with key > `key` (>= with `include_equal`)
    pub(crate) fn above(&self, key: &Value, include_equal: bool) -> Result<HashSet<u64>> {
        let mut result = HashSet::new();
        let Some(start) = self.nearest(key)? else {
            return Ok(result);
        };

        let mut next = start.right;
        let mut first = true;
        while next != 0 {
            let Some(node) = self.node_at(next)? else {
                break;
            };
            next = node.right;
            // Only the first node after the predecessor can equal the key
            if first {
                first = false;
                if !include_equal && node.key(self.store())?.force_eq(key) {
                    continue;
                }
            }
            result.insert(node.position);
        }
        Ok(result)
    }

    /// Positions of record nodes with key < `key` (<= with `include_equal`)
    pub(crate) fn below(&self, key: &Value, include_equal: bool) -> Result<HashSet<u64>> {
        let mut result = HashSet::new();
        let Some(start) = self.nearest(key)? else {
            return Ok(result);
        };

        if include_equal && start.right != 0 {
            if let Some(next) = self.node_at(start.right)? {
                if next.key(self.store())?.force_eq(key) {
                    result.insert(next.position);
                }
            }
        }

        let mut current = start;
        while !current.is_head() {
            result.insert(current.position);
            match self.node_at(current.left)? {
                Some(left) => current = left,
                None => break,
            }
        }
        Ok(result)
    }

    // =========================================================================
    // Level 0 Walks
    // =========================================================================

    /// Visit record nodes in key order until `visit` returns false
    pub(crate) fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&SkipNode) -> Result<bool>,
    {
        let Some(head) = self.base_head()? else {
            return Ok(());
        };

        let mut next = head.right;
        while next != 0 {
            let Some(node) = self.node_at(next)? else {
                break;
            };
            if !visit(&node)? {
                break;
            }
            next = node.right;
        }
        Ok(())
    }

    /// Node with the smallest key
    pub(crate) fn first(&self) -> Result<Option<SkipNode>> {
        let Some(head) = self.base_head()? else {
            return Ok(None);
        };
        if head.right == 0 {
            return Ok(None);
        }
        self.node_at(head.right)
    }

    /// Node with the largest key (express lanes first, then level 0)
    pub(crate) fn last(&self) -> Result<Option<SkipNode>> {
        let Some(mut current) = self.top_head()? else {
            return Ok(None);
        };

        loop {
            while current.right != 0 {
                match self.node_at(current.right)? {
                    Some(next) => current = next,
                    None => break,
                }
            }
            if current.down == 0 {
                break;
            }
            match self.node_at(current.down)? {
                Some(down) => current = down,
                None => break,
            }
        }

        Ok((!current.is_head()).then_some(current))
    }
}

impl std::fmt::Debug for SkipListCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipListCore")
            .field("name", &self.name)
            .field("header", &self.header.position())
            .field("len", &self.len())
            .field("journaled", &self.hook.is_some())
            .finish()
    }
}
