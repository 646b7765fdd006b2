//! # Per-destination request state.
//!
//! One [`DestState`] record exists per connected destination, created on
//! connect and discarded on disconnect. It tracks the in-flight cancel
//! handle, the monotonic operation sequence counter, the last adopted request
//! key, the deadline timer, and the piggyback retry latch.
//!
//! ## Rules
//! - `seq` is monotonically non-decreasing and incremented exactly once per
//!   newly **started** operation (never for cache hits or piggy-backed
//!   completions).
//! - A present cancel handle refers to exactly one still-possibly-running
//!   operation; starting or aborting supersedes the previous handle before a
//!   new one is assigned.
//! - Handle/timer ids point into the engine's flat
//!   [`HandleRegistry`](super::registry::HandleRegistry) so teardown never
//!   needs this table.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use crate::types::{DestinationId, RequestKey};

use super::registry::HandleId;

/// Mutable request state of one connected destination.
#[derive(Debug, Default)]
pub(crate) struct DestState {
    /// In-flight operation's cancel handle and its flat-registry id.
    pub(crate) cancel: Option<(HandleId, CancellationToken)>,
    /// Operation sequence counter; the latest started operation wins.
    pub(crate) seq: u64,
    /// Last request key this destination started or adopted.
    pub(crate) current_key: Option<RequestKey>,
    /// Flat-registry id of the in-flight operation's deadline timer.
    pub(crate) deadline: Option<HandleId>,
    /// True while piggy-backing on another destination's operation and the
    /// single automatic retry has not yet been consumed.
    pub(crate) retry_armed: bool,
}

/// Owned table of destination records, keyed by stable destination id.
#[derive(Debug, Default)]
pub(crate) struct DestinationTable {
    map: HashMap<DestinationId, DestState>,
}

impl DestinationTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn contains(&self, dest: &DestinationId) -> bool {
        self.map.contains_key(dest)
    }

    pub(crate) fn get(&self, dest: &DestinationId) -> Option<&DestState> {
        self.map.get(dest)
    }

    pub(crate) fn get_mut(&mut self, dest: &DestinationId) -> Option<&mut DestState> {
        self.map.get_mut(dest)
    }

    /// Returns the record for `dest`, creating an empty one if absent.
    pub(crate) fn get_or_create(&mut self, dest: &DestinationId) -> &mut DestState {
        self.map.entry(dest.clone()).or_default()
    }

    /// Removes and returns the record for `dest`.
    pub(crate) fn remove(&mut self, dest: &DestinationId) -> Option<DestState> {
        self.map.remove(dest)
    }

    /// Snapshot of all connected destination ids.
    pub(crate) fn ids(&self) -> Vec<DestinationId> {
        self.map.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }
}
