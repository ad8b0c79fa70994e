//! Entity contract
//!
//! An entity is a record type with a fixed schema. Implementors usually keep
//! the schema in a `OnceLock` and forward `Streamable` to the helpers here:
//!
//! ```ignore
//! impl Streamable for Account {
//!     fn write(&self, buffer: &mut BufferStream) -> Result<()> {
//!         write_entity(self, buffer)
//!     }
//!
//!     fn read(buffer: &mut BufferStream) -> Result<Self> {
//!         read_entity(buffer)
//!     }
//! }
//! ```

use crate::buffer::{BufferStream, Streamable};
use crate::error::Result;
use crate::types::Value;

use super::{decode_record, encode_record, RecordSchema};

/// A record type stored with the slot layout
pub trait Entity: Streamable {
    /// Field table shared by every instance
    fn schema() -> &'static RecordSchema;

    /// Attribute values in schema order
    fn attributes(&self) -> Vec<Value>;

    /// Rebuild an instance from values in schema order
    fn from_attributes(values: Vec<Value>) -> Result<Self>;
}

/// Encode an entity with its schema's layout
pub fn write_entity<E: Entity>(entity: &E, buffer: &mut BufferStream) -> Result<()> {
    encode_record(E::schema(), &entity.attributes(), buffer)
}

/// Decode an entity written by [`write_entity`]
pub fn read_entity<E: Entity>(buffer: &mut BufferStream) -> Result<E> {
    let values = decode_record(E::schema(), buffer)?;
    E::from_attributes(values)
}
