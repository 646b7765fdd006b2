//! # Engine events emitted during orchestration passes.
//!
//! The [`EventKind`] enum classifies events across three categories:
//! - **Lifecycle events**: destination connect/disconnect, engine detach
//! - **Operation events**: fetch start, settlement, discard, deadline
//! - **Policy events**: cache hits, dedup piggybacks, scheduled retries
//!
//! The [`Event`] struct carries metadata such as timestamps, destination,
//! request key, and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// A destination connected to the producer.
    ///
    /// Sets: `destination`, `at`, `seq`.
    DestinationConnected,

    /// A destination disconnected; its state record was discarded.
    ///
    /// Sets: `destination`, `at`, `seq`.
    DestinationDisconnected,

    /// The engine was detached; every live operation was cancelled and every
    /// timer cleared via the flat registries.
    ///
    /// Sets: `at`, `seq`.
    Detached,

    // === Operation events ===
    /// A new fetch operation started for a destination.
    ///
    /// Sets: `destination`, `key`, `op_seq` (the destination's sequence
    /// number for this operation), `at`, `seq`.
    FetchStarted,

    /// A fetch settled successfully and its result was applied (cached when
    /// caching is enabled, then broadcast to all matching destinations).
    ///
    /// Sets: `destination` (originator), `key`, `op_seq`, `at`, `seq`.
    FetchCompleted,

    /// A fetch settled with an error. The failure is swallowed: outputs keep
    /// their last published values.
    ///
    /// Sets: `destination` (originator), `key`, `reason`, `at`, `seq`.
    FetchFailed,

    /// A fetch completed but its result was discarded (handle cancelled, or
    /// superseded by a newer operation under latest-only ordering).
    ///
    /// Sets: `destination`, `key`, `reason` (`"cancelled"`/`"superseded"`),
    /// `at`, `seq`.
    FetchDiscarded,

    /// A deadline timer fired and cancelled an operation's handle.
    ///
    /// Sets: `destination`, `key`, `at`, `seq`.
    DeadlineHit,

    // === Policy events ===
    /// A live cache entry satisfied a kickoff; no operation was started.
    ///
    /// Sets: `destination` (triggering), `key`, `at`, `seq`.
    CacheHit,

    /// A kickoff attached to an operation already in flight for the same key
    /// instead of starting a new one (single-flight dedup).
    ///
    /// Sets: `destination`, `key`, `at`, `seq`.
    FetchShared,

    /// A piggy-backed destination's adopted operation settled without a
    /// cacheable result; the single automatic retry was scheduled.
    ///
    /// Sets: `destination`, `key`, `at`, `seq`.
    RetryScheduled,

    /// Parameters became insufficient for a destination; the configured reset
    /// values were published and any in-flight operation cancelled.
    ///
    /// Sets: `destination`, `at`, `seq`.
    ResetPublished,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Destination the event concerns, if applicable.
    pub destination: Option<Arc<str>>,
    /// Request key the event concerns, if applicable.
    pub key: Option<Arc<str>>,
    /// Human-readable reason (errors, discard causes, etc.).
    pub reason: Option<Arc<str>>,
    /// The destination's operation sequence number, for operation events.
    pub op_seq: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next global sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            destination: None,
            key: None,
            reason: None,
            op_seq: None,
        }
    }

    /// Attaches the destination id.
    #[inline]
    pub fn with_destination(mut self, destination: impl Into<Arc<str>>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Attaches the request key.
    #[inline]
    pub fn with_key(mut self, key: impl Into<Arc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches the destination's operation sequence number.
    #[inline]
    pub fn with_op_seq(mut self, op_seq: u64) -> Self {
        self.op_seq = Some(op_seq);
        self
    }
}
