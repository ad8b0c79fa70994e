//! Record references
//!
//! The addressing unit handed to layers above the storage core.

use serde::{Deserialize, Serialize};

use crate::buffer::{BufferStream, Streamable};
use crate::error::Result;

/// Partition used when an entity is not partitioned
pub const DEFAULT_PARTITION: i64 = 0;

/// Address of a stored entity: partition id plus the node position inside
/// that partition's map. Opaque beyond equality, ordering and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    pub partition: i64,
    pub position: u64,
}

impl Reference {
    pub fn new(partition: i64, position: u64) -> Self {
        Self {
            partition,
            position,
        }
    }

    /// Reference into the default partition
    pub fn unpartitioned(position: u64) -> Self {
        Self::new(DEFAULT_PARTITION, position)
    }
}

impl Streamable for Reference {
    fn write(&self, buffer: &mut BufferStream) -> Result<()> {
        buffer.put_i64(self.partition);
        buffer.put_u64(self.position);
        Ok(())
    }

    fn read(buffer: &mut BufferStream) -> Result<Self> {
        let partition = buffer.get_i64()?;
        let position = buffer.get_u64()?;
        Ok(Self {
            partition,
            position,
        })
    }
}
