//! Skip List Module
//!
//! An ordered map whose nodes live in a `Store` and link to each other by
//! position instead of by pointer.
//!
//! ## Responsibilities
//! - Node layout and lazy key loading
//! - Insert with random tower height, overwrite, unsplice, clear
//! - Point lookup, nearest, above/below range scans
//! - Per-map header bookkeeping (head tower, record count)
//!
//! ## Structure
//! ```text
//!   Header ──▶ H3 ─────────────────────────▶ [20]
//!              │                               │
//!              H2 ──────────▶ [10] ──────────▶ [20]
//!              │               │               │
//!              H1 ──▶ [5] ──▶ [10] ──────────▶ [20]
//!              │       │       │               │
//!   base ────▶ H0 ──▶ [5] ──▶ [10] ──▶ [15] ──▶ [20]
//!                      r       r        r       r      r = record pointer
//! ```
//! Every level is a doubly linked list (left/right), every tower a doubly
//! linked chain (up/down). Only level 0 nodes point at a record; all nodes of
//! a tower share one key block.
//!
//! ## Node Format (49 bytes)
//! ```text
//! ┌────────┬────────┬──────┬───────┬──────┬──────┬───────────┐
//! │ Key(8) │ Rec(8) │ L(8) │ R(8)  │ U(8) │ D(8) │ Level (1) │
//! └────────┴────────┴──────┴───────┴──────┴──────┴───────────┘
//! ```
//!
//! Overwritten values, removed towers and cleared graphs stay in the store;
//! space is never reclaimed.

mod header;
mod list;
mod map;
mod node;

pub(crate) use list::SkipListCore;
pub use header::{Header, HEADER_SIZE, MAX_LEVEL_LIMIT};
pub use map::{DetachedSkipListMap, DiskMap, SkipListMap};
pub use node::{SkipNode, NODE_SIZE};
