//! Skip list nodes

use crate::buffer::{BufferStream, Streamable};
use crate::error::{Result, TowerError};
use crate::store::{Store, StoreExt};
use crate::types::Value;

/// Encoded size of a node
pub const NODE_SIZE: usize = 49;

/// One node of one level
///
/// All pointers are store positions, 0 meaning "none". Nodes of the same
/// tower share `key_position`; only the level 0 node carries `record`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipNode {
    /// Own position (not encoded)
    pub position: u64,
    /// Block holding the tagged key, 0 for head nodes
    pub key_position: u64,
    /// Block holding the value, 0 for heads and upper levels
    pub record: u64,
    pub left: u64,
    pub right: u64,
    pub up: u64,
    pub down: u64,
    pub level: u8,
}

impl SkipNode {
    /// Allocate and write a head node for `level`
    pub fn create(store: &dyn Store, level: u8) -> Result<Self> {
        let position = store.allocate(NODE_SIZE as u64)?;
        let node = Self {
            position,
            key_position: 0,
            record: 0,
            left: 0,
            right: 0,
            up: 0,
            down: 0,
            level,
        };
        node.write(store)?;
        Ok(node)
    }

    /// Allocate a new tower node; the caller links and writes it
    pub(crate) fn allocate(store: &dyn Store, key_position: u64, level: u8) -> Result<Self> {
        let position = store.allocate(NODE_SIZE as u64)?;
        Ok(Self {
            position,
            key_position,
            record: 0,
            left: 0,
            right: 0,
            up: 0,
            down: 0,
            level,
        })
    }

    /// Load the node at `position`; `None` when it lies outside the store
    pub fn read(store: &dyn Store, position: u64) -> Result<Option<Self>> {
        let node: Option<SkipNode> = store.read_object(position, NODE_SIZE)?;
        Ok(node.map(|node| Self { position, ..node }))
    }

    /// Persist the node at its own position
    pub fn write(&self, store: &dyn Store) -> Result<()> {
        store.write_object(self, self.position)?;
        Ok(())
    }

    /// Decode the key, reading it from the store
    pub fn key(&self, store: &dyn Store) -> Result<Value> {
        if self.is_head() {
            return Err(TowerError::Corruption(format!(
                "head node {} has no key",
                self.position
            )));
        }
        store
            .read_block_object::<Value>(self.key_position)?
            .ok_or_else(|| {
                TowerError::Corruption(format!(
                    "node {} points at key {} beyond the store",
                    self.position, self.key_position
                ))
            })
    }

    pub fn is_head(&self) -> bool {
        self.key_position == 0
    }

    /// Whether this node holds a value (level 0 of a tower)
    pub fn is_record(&self) -> bool {
        self.record != 0
    }
}

impl Streamable for SkipNode {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        buffer.put_u64(self.key_position);
        buffer.put_u64(self.record);
        buffer.put_u64(self.left);
        buffer.put_u64(self.right);
        buffer.put_u64(self.up);
        buffer.put_u64(self.down);
        buffer.put_u8(self.level);
        Ok(())
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        Ok(Self {
            position: 0,
            key_position: buffer.get_u64()?,
            record: buffer.get_u64()?,
            left: buffer.get_u64()?,
            right: buffer.get_u64()?,
            up: buffer.get_u64()?,
            down: buffer.get_u64()?,
            level: buffer.get_u8()?,
        })
    }
}
