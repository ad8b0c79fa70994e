//! Cache Module
//!
//! Query result caching on top of record references.
//!
//! ## Responsibilities
//! - Keep the reference sets of recently executed queries
//! - Patch those sets when a record is inserted, updated or deleted
//! - Bound memory with LRU eviction and a time-to-live
//!
//! Queries are opaque here: any hashable key works, and deciding whether a
//! changed record matches a query is left to the caller.

mod query_cache;
mod results;

pub use query_cache::{QueryCache, DEFAULT_CAPACITY, DEFAULT_TTL};
pub use results::{CachedResults, ChangeEvent};
