//! # Result caching: contract and default in-memory store.
//!
//! The engine consults a key → value cache before starting an operation and
//! stores successful results back with the configured TTL. The cache is
//! pluggable: hosts may substitute any implementation of [`ValueCache`]
//! (for example, a cross-process shared store), but the default
//! [`MemoryCache`] is in-memory, bounded, and TTL-aware.
//!
//! ## Contract
//! - `get` returns absent for missing **or expired** entries; reads never
//!   extend the TTL (no sliding expiry).
//! - `set` inserts or refreshes an entry and evicts the least-recently-used
//!   entry when capacity is exceeded.

use std::time::Duration;

use serde_json::Value;

use crate::types::RequestKey;

mod memory;

pub use memory::MemoryCache;

/// Contract for the engine's result cache.
///
/// Implementations must be cheap to call from the synchronous parts of the
/// orchestration pass: both methods are called while engine state is locked.
pub trait ValueCache: Send + Sync + 'static {
    /// Returns the live value for `key`, or `None` if missing or expired.
    fn get(&self, key: &RequestKey) -> Option<Value>;

    /// Inserts or refreshes `key` with the given time-to-live.
    fn set(&self, key: RequestKey, value: Value, ttl: Duration);
}
