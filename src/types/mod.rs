//! Types Module
//!
//! The value model shared by keys, records and references.
//!
//! ## Responsibilities
//! - `Value`: the closed, tagged variant used for keys and generic payloads
//! - Force-compare: the single authority for key ordering and equality
//! - `Reference`: (partition, position) address of a stored record
//!
//! ## Value Encoding
//! ```text
//! ┌──────────┬───────────────────────────────────────────┐
//! │ Tag (1)  │ Payload (fixed width or length-prefixed)  │
//! └──────────┴───────────────────────────────────────────┘
//! ```

mod compare;
mod reference;
mod value;

pub use compare::{CompareOperator, Family};
pub use reference::{Reference, DEFAULT_PARTITION};
pub use value::{TypeTag, Value};

pub(crate) use value::decode_char;
