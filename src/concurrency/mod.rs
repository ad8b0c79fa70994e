//! Concurrency Module
//!
//! Locking discipline for shared maps and the background commit task.
//!
//! ## Lock States
//! ```text
//!                 read() / optimistic fallback
//!        ┌──────────────────────────────────────┐
//!        │                                      ▼
//!   ┌─────────┐   write()   ┌──────────────┐  ┌────────────┐
//!   │  Idle   │────────────▶│ WriteLocked  │  │ ReadLocked │
//!   └─────────┘◀────────────└──────────────┘  └────────────┘
//!        │  ▲      release                          │
//!        │  └───────────────────────────────────────┘
//!        │
//!        └── optimistic_read(): no lock taken, stamp validated afterwards
//! ```

mod commit;
mod lock;

pub use commit::CommitJob;
pub use lock::StampedLock;
