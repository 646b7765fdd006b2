//! # Pending-operation table (single-flight per request key).
//!
//! Maps each request key to the single in-flight operation currently serving
//! it. Destinations that resolve to a key with a pending entry attach a
//! completion observer instead of starting their own operation; when the
//! operation settles (success **or** failure, cancellation included) the
//! entry is removed and all observers are released.
//!
//! ## Rules
//! - At most one entry per key at any time; insertion happens under the same
//!   engine lock as the membership check (the per-key check-and-set).
//! - Settlement notifies observers strictly **after** a successful result has
//!   been written to the cache, so released observers re-checking the cache
//!   see it.

use std::collections::HashMap;

use tokio::sync::watch;

use crate::types::RequestKey;

/// Table of in-flight operations, keyed by request key.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    ops: HashMap<RequestKey, watch::Sender<bool>>,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// True if an operation for `key` is in flight.
    pub(crate) fn contains(&self, key: &RequestKey) -> bool {
        self.ops.contains_key(key)
    }

    /// Registers a fresh in-flight operation for `key`.
    ///
    /// Callers must have checked [`contains`](Self::contains) under the same
    /// lock; a duplicate insert would violate single-flight.
    pub(crate) fn insert(&mut self, key: RequestKey) {
        let (tx, _rx) = watch::channel(false);
        debug_assert!(!self.ops.contains_key(&key), "duplicate pending op for key");
        let _ = self.ops.insert(key, tx);
    }

    /// Returns a settlement observer for the operation serving `key`.
    ///
    /// The receiver resolves (value change or sender drop) once the operation
    /// settles.
    pub(crate) fn subscribe(&self, key: &RequestKey) -> Option<watch::Receiver<bool>> {
        self.ops.get(key).map(watch::Sender::subscribe)
    }

    /// Removes the entry for `key` and releases all observers.
    pub(crate) fn settle(&mut self, key: &RequestKey) {
        if let Some(tx) = self.ops.remove(key) {
            let _ = tx.send_replace(true);
        }
    }

    /// Drops every entry, releasing all observers (sender drop).
    pub(crate) fn clear(&mut self) {
        self.ops.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.ops.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_settle_releases_observer() {
        let mut table = PendingTable::new();
        let key = RequestKey::from("k");
        table.insert(key.clone());
        assert!(table.contains(&key));

        let mut rx = table.subscribe(&key).expect("entry pending");
        table.settle(&key);
        assert!(!table.contains(&key));
        assert!(rx.changed().await.is_ok(), "observer sees the settlement");
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_clear_releases_observer_via_drop() {
        let mut table = PendingTable::new();
        let key = RequestKey::from("k");
        table.insert(key.clone());
        let mut rx = table.subscribe(&key).expect("entry pending");

        table.clear();
        assert_eq!(table.len(), 0);
        // Sender dropped without a value change: observer resolves with Err.
        assert!(rx.changed().await.is_err());
    }

    #[test]
    fn test_subscribe_unknown_key() {
        let table = PendingTable::new();
        assert!(table.subscribe(&RequestKey::from("missing")).is_none());
    }
}
