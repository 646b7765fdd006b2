//! # Engine configuration.
//!
//! Provides [`EngineConfig`] — immutable settings for one engine instance.
//!
//! ## Sentinel values
//! - `cache_ttl = 0s` → caching disabled (no cache reads or writes)
//! - `deadline = 0s` → no deadline (operations run until they settle)
//! - `debounce` is informational only: coalescing of rapid parameter changes
//!   is the responsibility of the host graph, not this engine
//!
//! All fields are public for flexibility. Prefer the helper accessors to avoid
//! sprinkling sentinel checks (`0`) across the codebase.

use std::time::Duration;

/// Immutable configuration for one engine instance.
///
/// Controls caching, deadlines, result ordering, and the capacity of the
/// observability event bus.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Time-to-live for cache entries.
    ///
    /// - `Duration::ZERO` = caching disabled
    /// - `> 0` = results are cached under their request key for this long
    pub cache_ttl: Duration,

    /// Maximum number of cache entries before least-recently-used eviction.
    ///
    /// Minimum 1 (clamped by the default cache). Ignored by host-supplied
    /// cache implementations with their own bounds.
    pub cache_capacity: usize,

    /// Deadline for one fetch operation.
    ///
    /// - `Duration::ZERO` = no deadline
    /// - `> 0` = the operation's cancel handle is triggered after this long
    pub deadline: Duration,

    /// Whether the most recently *started* request per destination wins.
    ///
    /// When enabled (default), a completion whose sequence number has been
    /// superseded by a newer start for the same destination is discarded
    /// regardless of completion order.
    pub latest_only: bool,

    /// Advisory debounce window for parameter changes.
    ///
    /// The engine does not coalesce; hosts that debounce should honor this.
    pub debounce: Duration,

    /// Capacity of the observability event bus ring buffer.
    ///
    /// Slow subscribers that lag behind more than this many events observe
    /// `Lagged` and skip older items. Minimum 1 (clamped).
    pub bus_capacity: usize,
}

impl EngineConfig {
    /// True if caching is enabled (`cache_ttl > 0`).
    #[inline]
    pub fn cache_enabled(&self) -> bool {
        self.cache_ttl > Duration::ZERO
    }

    /// Returns the per-operation deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → cancel the operation after `d`
    #[inline]
    pub fn deadline_limit(&self) -> Option<Duration> {
        if self.deadline == Duration::ZERO {
            None
        } else {
            Some(self.deadline)
        }
    }

    /// Returns the cache capacity clamped to a minimum of 1.
    #[inline]
    pub fn cache_capacity_clamped(&self) -> usize {
        self.cache_capacity.max(1)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `cache_ttl = 30s` (caching on)
    /// - `cache_capacity = 200`
    /// - `deadline = 0s` (no deadline)
    /// - `latest_only = true`
    /// - `debounce = 0s` (advisory; none)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            cache_capacity: 200,
            deadline: Duration::ZERO,
            latest_only: true,
            debounce: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}
