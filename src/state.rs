//! # Local producer state (`StateHandle`).
//!
//! Some producer configurations expose a read/write key/value state handle
//! alongside their outputs: the key function may fold local state into the
//! request key, and the fetch function may read or update it.
//!
//! The handle is shared (cheap to clone) and scoped to one engine instance.
//! Writes that go through [`Engine::write_state`](crate::Engine::write_state)
//! and actually change a value trigger a full re-kickoff across all connected
//! destinations; writes through the raw handle (for example, from inside a
//! fetch) never trigger anything on their own.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Shared key/value state scoped to one engine instance.
#[derive(Clone, Debug, Default)]
pub struct StateHandle {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl StateHandle {
    /// Creates an empty state handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the value stored under `id`, if any.
    pub fn get(&self, id: &str) -> Option<Value> {
        self.inner.read().get(id).cloned()
    }

    /// Stores `value` under `id`.
    ///
    /// Returns `true` if the stored value actually changed (insert of a new
    /// id, or overwrite with a different value). Writing an unchanged value
    /// is a no-op and returns `false`.
    pub fn set(&self, id: impl Into<String>, value: Value) -> bool {
        let id = id.into();
        let mut map = self.inner.write();
        if map.get(&id) == Some(&value) {
            return false;
        }
        let _ = map.insert(id, value);
        true
    }

    /// Returns a snapshot of the full state map.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.read().clone()
    }
}
