//! # Flat registry of live cancel handles and deadline timers.
//!
//! Every cancellation token and every deadline timer created for any
//! destination is registered here in addition to the owning destination
//! record. Full-engine teardown drains this registry instead of enumerating
//! destinations, so release works even when individual destination records
//! have already been discarded.
//!
//! ## Rules
//! - Registration returns a [`HandleId`]; the id is stored in the destination
//!   record so settlement can release exactly its own handle.
//! - `release_all` cancels every token and aborts every timer, then clears
//!   both maps.

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identifier of one registered handle (unique within an engine).
pub(crate) type HandleId = u64;

/// Flat, iterable registry spanning all destinations of one engine.
#[derive(Debug, Default)]
pub(crate) struct HandleRegistry {
    next: HandleId,
    cancels: HashMap<HandleId, CancellationToken>,
    timers: HashMap<HandleId, JoinHandle<()>>,
}

impl HandleRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a cancellation token; returns its id.
    pub(crate) fn register_cancel(&mut self, token: CancellationToken) -> HandleId {
        let id = self.next_id();
        let _ = self.cancels.insert(id, token);
        id
    }

    /// Unregisters a cancellation token without cancelling it.
    pub(crate) fn remove_cancel(&mut self, id: HandleId) {
        let _ = self.cancels.remove(&id);
    }

    /// Registers a deadline timer task; returns its id.
    pub(crate) fn register_timer(&mut self, handle: JoinHandle<()>) -> HandleId {
        let id = self.next_id();
        let _ = self.timers.insert(id, handle);
        id
    }

    /// Aborts and unregisters a deadline timer. No-op for unknown ids.
    pub(crate) fn abort_timer(&mut self, id: HandleId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }

    /// Cancels every live token, aborts every live timer, clears both maps.
    pub(crate) fn release_all(&mut self) {
        for (_, token) in self.cancels.drain() {
            token.cancel();
        }
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }

    /// Number of live cancel handles.
    pub(crate) fn cancel_count(&self) -> usize {
        self.cancels.len()
    }

    /// Number of live deadline timers.
    pub(crate) fn timer_count(&self) -> usize {
        self.timers.len()
    }

    fn next_id(&mut self) -> HandleId {
        self.next += 1;
        self.next
    }
}
