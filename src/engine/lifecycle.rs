//! # Lifecycle and reactivity hooks.
//!
//! The host drives the engine exclusively through these hooks: destination
//! connect/disconnect, full detach, parameter changes, explicit produce
//! requests, and local state writes. Each hook maps to one or more
//! orchestration passes of the [core](super::core).
//!
//! ## Rules
//! - Connect and disconnect are idempotent per destination.
//! - The initial-values publish happens at most once per engine, on the first
//!   connect ever, before that destination's first orchestration pass.
//! - Detach releases every live handle through the flat registry and leaves
//!   the engine empty but reusable.

use std::sync::Arc;

use serde_json::Value;

use crate::events::{Event, EventKind};
use crate::types::DestinationId;

use super::core::Engine;

impl Engine {
    /// Registers a destination and runs its first orchestration pass.
    ///
    /// The very first connect over the engine's lifetime additionally
    /// publishes the producer's initial values to that destination before the
    /// pass runs.
    pub async fn on_connect(self: &Arc<Self>, dest: &DestinationId) {
        let first_ever = {
            let mut st = self.inner.lock().await;
            let first = !st.saw_first_connect;
            st.saw_first_connect = true;
            let _ = st.destinations.get_or_create(dest);
            first
        };

        self.bus
            .publish(Event::now(EventKind::DestinationConnected).with_destination(dest.as_str()));

        if first_ever {
            let params = self.resolver.resolve(dest);
            let initial = self.producer.initial_updates(params.as_ref(), &self.state);
            if !initial.is_empty() {
                let _ = self.publisher.publish(&initial, Some(dest)).await;
            }
        }

        self.kickoff(dest, false).await;
    }

    /// Cancels the destination's in-flight work and discards its record.
    ///
    /// Unknown destinations are a no-op. An operation the destination was
    /// piggy-backing on keeps running for its owner.
    pub async fn on_disconnect(&self, dest: &DestinationId) {
        {
            let mut st = self.inner.lock().await;
            Self::abort_inflight(&mut st, dest);
            if st.destinations.remove(dest).is_none() {
                return;
            }
        }
        self.bus
            .publish(Event::now(EventKind::DestinationDisconnected).with_destination(dest.as_str()));
    }

    /// Tears the engine down: cancels every live token, aborts every timer,
    /// drops all destination records and pending operations.
    ///
    /// Settlement observers of dropped operations are released. The engine
    /// stays usable; new connects start from a clean slate (the initial
    /// publish does not repeat).
    pub async fn on_detach(&self) {
        {
            let mut st = self.inner.lock().await;
            st.handles.release_all();
            st.destinations.clear();
            st.pending.clear();
        }
        self.bus.publish(Event::now(EventKind::Detached));
    }

    /// Re-runs orchestration for every destination after a shared-parameter
    /// change. Destinations whose key is unchanged resolve via cache or dedup.
    pub async fn on_home_params_changed(self: &Arc<Self>) {
        self.kickoff_all(false).await;
    }

    /// Re-runs orchestration for one destination after its own parameters
    /// changed, but only when the new parameters resolve to a request key.
    ///
    /// Transitional states where the key is not yet computable do not tear
    /// down in-flight work; the next resolvable change picks it up.
    pub async fn on_destination_params_changed(self: &Arc<Self>, dest: &DestinationId) {
        let resolvable = self
            .resolver
            .resolve(dest)
            .and_then(|p| self.producer.request_key(&p, &self.state))
            .is_some();
        if resolvable {
            self.kickoff(dest, false).await;
        }
    }

    /// Explicit production request from the host.
    ///
    /// `destination = None` targets all connected destinations.
    /// `force_refetch` bypasses the cache check but still deduplicates
    /// against in-flight operations.
    pub async fn produce(self: &Arc<Self>, destination: Option<&DestinationId>, force_refetch: bool) {
        match destination {
            Some(dest) => self.kickoff(dest, force_refetch).await,
            None => self.kickoff_all(force_refetch).await,
        }
    }

    /// Writes one entry of the engine-local state.
    ///
    /// A write that actually changes the stored value re-runs orchestration
    /// for all destinations (request keys may depend on local state).
    /// Identical writes are no-ops.
    pub async fn write_state(self: &Arc<Self>, id: impl Into<String>, value: Value) {
        if self.state.set(id, value) {
            self.kickoff_all(false).await;
        }
    }

    async fn kickoff_all(self: &Arc<Self>, force_refetch: bool) {
        let ids = {
            let st = self.inner.lock().await;
            st.destinations.ids()
        };
        for id in ids {
            self.kickoff(&id, force_refetch).await;
        }
    }
}
