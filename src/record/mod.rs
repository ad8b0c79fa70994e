//! Record Module
//!
//! Slot-table layout for entities, so one attribute can be read straight from
//! the store without decoding the rest of the record.
//!
//! ## Responsibilities
//! - `RecordSchema`: field names, types and slot offsets, computed once per type
//! - Encode/decode a whole record from its attribute values
//! - Read a single attribute by position (partial deserialization)
//!
//! ## Record Layout
//! ```text
//! ┌───────────┬──────────────┬──────────────────────────────┬──────────┐
//! │ Count (2) │ HeapLen (4)  │ Slot 0 .. Slot N-1 (9 each)  │   Heap   │
//! └───────────┴──────────────┴──────────────────────────────┴──────────┘
//!
//! Slot: ┌─────────┬─────────────────────────────────────────┐
//!       │ Tag (1) │ Payload (8)                             │
//!       └─────────┴─────────────────────────────────────────┘
//!   fixed types    payload is the value itself (ints as i64, floats as f64)
//!   text / bytes   payload is heap offset (4) + length (4), heap holds raw bytes
//!   other values   payload is heap offset (4) + length (4), heap holds the
//!                  tagged value encoding
//! ```
//!
//! Inside the store a record is written as a length-prefixed block, so the
//! record body starts 4 bytes after the record position.

mod entity;
mod layout;
mod schema;

pub use entity::{read_entity, write_entity, Entity};
pub use layout::{decode_record, encode_record, read_attribute, RECORD_HEADER_SIZE, SLOT_SIZE};
pub use schema::{Field, FieldType, RecordSchema};
