//! Buffer Module
//!
//! Reusable binary encode/decode buffers.
//!
//! ## Responsibilities
//! - Turn primitives, strings and tagged values into bytes and back
//! - Define the `Streamable` contract for self-describing objects
//! - Pool buffers so hot paths (every put/get) do not allocate
//!
//! ## Encoding Rules
//! ```text
//! Primitives        big-endian, fixed width (i8..i64, u8..u64, f32, f64)
//! bool              1 byte (0 / 1)
//! String / bytes    ┌──────────┬──────────────┐
//!                   │ Len (4)  │    Data      │
//!                   └──────────┴──────────────┘
//! Vec<T>            Count (4) + items
//! Option<T>         Flag (1) + item when flag = 1
//! Value             Tag (1) + type specific payload (see types::value)
//! ```

mod pool;
mod stream;
mod streamable;

pub use pool::BufferPool;
pub use stream::BufferStream;
pub use streamable::Streamable;
