//! # Orchestration core: the `kickoff` algorithm.
//!
//! [`Engine`] turns a potentially-changing set of parameters per destination
//! into at most one outstanding operation per unique request key, with
//! caching, cancellation, deadline enforcement, latest-only ordering under
//! concurrent re-triggering, and bulk resource release.
//!
//! ## One orchestration pass (`kickoff`)
//! ```text
//! kickoff(dest, force_refetch)
//!   ├─► resolve params ── absent ──► cancel in-flight, clear key, stop
//!   ├─► compute key ───── absent ──► cancel in-flight, clear key,
//!   │                                publish reset values, stop
//!   ├─► key changed? ──► cancel previous op (stale values stay visible)
//!   ├─► cache hit? (skipped when force_refetch or ttl=0)
//!   │        └─► broadcast to ALL destinations matching key, stop
//!   ├─► key already pending? (NOT skipped by force_refetch)
//!   │        └─► arm retry latch, observe settlement, stop
//!   └─► start fresh operation:
//!          seq += 1, new cancel token (+ flat registry),
//!          optional deadline timer (+ flat registry),
//!          pending[key] = op, spawn fetch
//!
//! settle(result)
//!   ├─► cancelled        → discard silently
//!   ├─► superseded (seq) → discard (latest-only)
//!   ├─► failed           → swallow (outputs keep last values)
//!   ├─► ok               → cache (if enabled), broadcast to ALL matching
//!   └─► always: release handles, remove pending[key], wake observers
//! ```
//!
//! ## Rules
//! - All engine state lives behind one async mutex; every pass (kickoff,
//!   broadcast, settlement) runs under it, so the per-key check-and-set and
//!   the broadcast pass are atomic with respect to each other.
//! - The only suspension outside the lock is the fetch itself.
//! - Broadcasting applies one outcome to **every** destination whose freshly
//!   resolved key matches, not only the triggering one: destinations sharing
//!   a key converge without redundant operations.
//! - `force_refetch` bypasses the cache check but **not** the dedup check: a
//!   forced refetch issued while an operation for the same key is in flight
//!   adopts that operation's result.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cache::ValueCache;
use crate::config::EngineConfig;
use crate::error::FetchError;
use crate::events::{Bus, Event, EventKind};
use crate::host::{Publish, ResolveParams};
use crate::producers::Producer;
use crate::state::StateHandle;
use crate::types::{DestinationId, RequestKey};

use super::destinations::DestinationTable;
use super::pending::PendingTable;
use super::registry::{HandleId, HandleRegistry};

/// Mutable engine state, guarded by the engine's single lock.
pub(super) struct EngineState {
    pub(super) destinations: DestinationTable,
    pub(super) pending: PendingTable,
    pub(super) handles: HandleRegistry,
    pub(super) saw_first_connect: bool,
}

/// Everything one started operation needs to settle itself.
struct Flight {
    destination: DestinationId,
    key: RequestKey,
    op_seq: u64,
    cancel_id: HandleId,
    timer_id: Option<HandleId>,
    token: CancellationToken,
}

/// Orchestrates fetches for one producer instance.
///
/// Construct with [`Engine::builder`]; drive it through the lifecycle hooks
/// ([`on_connect`](Engine::on_connect), [`on_disconnect`](Engine::on_disconnect),
/// [`on_detach`](Engine::on_detach), the parameter-change hooks) and
/// [`produce`](Engine::produce).
pub struct Engine {
    pub(super) cfg: EngineConfig,
    pub(super) producer: Arc<dyn Producer>,
    pub(super) resolver: Arc<dyn ResolveParams>,
    pub(super) publisher: Arc<dyn Publish>,
    pub(super) cache: Arc<dyn ValueCache>,
    pub(super) state: StateHandle,
    pub(super) bus: Bus,
    pub(super) inner: Mutex<EngineState>,
}

/// Point-in-time counts of live engine state, for hosts and diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct EngineSnapshot {
    /// Connected destinations.
    pub destinations: usize,
    /// In-flight operations (pending table entries).
    pub pending: usize,
    /// Live cancel handles in the flat registry.
    pub live_cancels: usize,
    /// Live deadline timers in the flat registry.
    pub live_timers: usize,
}

impl Engine {
    /// Starts an [`EngineBuilder`](super::EngineBuilder) with the given
    /// configuration.
    pub fn builder(cfg: EngineConfig) -> super::EngineBuilder {
        super::EngineBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: EngineConfig,
        producer: Arc<dyn Producer>,
        resolver: Arc<dyn ResolveParams>,
        publisher: Arc<dyn Publish>,
        cache: Arc<dyn ValueCache>,
        state: StateHandle,
        bus: Bus,
    ) -> Self {
        Self {
            cfg,
            producer,
            resolver,
            publisher,
            cache,
            state,
            bus,
            inner: Mutex::new(EngineState {
                destinations: DestinationTable::new(),
                pending: PendingTable::new(),
                handles: HandleRegistry::new(),
                saw_first_connect: false,
            }),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// The observability event bus. Subscribe to watch orchestration passes.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// The producer-instance-scoped local state handle.
    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Returns current counts of live engine state.
    pub async fn snapshot(&self) -> EngineSnapshot {
        let st = self.inner.lock().await;
        EngineSnapshot {
            destinations: st.destinations.len(),
            pending: st.pending.len(),
            live_cancels: st.handles.cancel_count(),
            live_timers: st.handles.timer_count(),
        }
    }

    /// Runs one orchestration pass for `dest`.
    ///
    /// Safe to call redundantly, concurrently with passes for other
    /// destinations, and for destinations that already disconnected (no-op).
    /// `force_refetch` skips the cache check; it does not skip dedup.
    ///
    /// Returns a boxed future: settlement observers re-enter `kickoff`, so
    /// the future type is erased at the recursion point.
    pub fn kickoff<'a>(
        self: &'a Arc<Self>,
        dest: &'a DestinationId,
        force_refetch: bool,
    ) -> BoxFuture<'a, ()> {
        Box::pin(self.kickoff_inner(dest, force_refetch))
    }

    async fn kickoff_inner(self: &Arc<Self>, dest: &DestinationId, force_refetch: bool) {
        let mut st = self.inner.lock().await;
        if !st.destinations.contains(dest) {
            return;
        }

        // 1. Resolve parameters; an unresolvable destination drops its work.
        let Some(params) = self.resolver.resolve(dest) else {
            Self::abort_inflight(&mut st, dest);
            if let Some(d) = st.destinations.get_mut(dest) {
                d.current_key = None;
            }
            return;
        };

        // 2. Insufficient parameters: cancel, clear the key, publish resets.
        // This is a defined state, not an error.
        let Some(key) = self.producer.request_key(&params, &self.state) else {
            Self::abort_inflight(&mut st, dest);
            if let Some(d) = st.destinations.get_mut(dest) {
                d.current_key = None;
            }
            let resets = self.producer.reset_updates(&params);
            let _ = self.publisher.publish(&resets, Some(dest)).await;
            self.bus
                .publish(Event::now(EventKind::ResetPublished).with_destination(dest.as_str()));
            return;
        };

        // 3. A new key supersedes the previous operation. Previously published
        // values stay visible until replacements arrive (stale-while-revalidate).
        let key_changed = st
            .destinations
            .get(dest)
            .and_then(|d| d.current_key.as_ref())
            .is_some_and(|k| *k != key);
        if key_changed {
            Self::abort_inflight(&mut st, dest);
        }

        // 4. Cache check.
        if self.cfg.cache_enabled() && !force_refetch {
            if let Some(value) = self.cache.get(&key) {
                if let Some(d) = st.destinations.get_mut(dest) {
                    d.retry_armed = false;
                }
                self.bus.publish(
                    Event::now(EventKind::CacheHit)
                        .with_destination(dest.as_str())
                        .with_key(key.as_str()),
                );
                self.broadcast(&mut st, &key, &value).await;
                return;
            }
        }

        // 5. Single-flight dedup: adopt the operation already serving this key.
        // At most one observer per destination per pending operation: an
        // armed latch means one is already attached.
        if st.pending.contains(&key) {
            if st.destinations.get(dest).is_some_and(|d| d.retry_armed) {
                return;
            }
            let Some(mut rx) = st.pending.subscribe(&key) else {
                return;
            };
            if let Some(d) = st.destinations.get_mut(dest) {
                d.retry_armed = true;
            }
            self.bus.publish(
                Event::now(EventKind::FetchShared)
                    .with_destination(dest.as_str())
                    .with_key(key.as_str()),
            );
            let engine = Arc::clone(self);
            let dest = dest.clone();
            drop(st);
            let _ = tokio::spawn(async move {
                // Err (sender dropped at detach) also means settled.
                let _ = rx.changed().await;
                engine.adopt_settled(&dest, &key).await;
            });
            return;
        }

        // 6. Start a fresh operation. Supersede any stale handle still
        // attached before assigning new ones.
        Self::abort_inflight(&mut st, dest);

        let token = CancellationToken::new();
        let cancel_id = st.handles.register_cancel(token.clone());

        let mut timer_id = None;
        if let Some(deadline) = self.cfg.deadline_limit() {
            let timer_token = token.clone();
            let bus = self.bus.clone();
            let timer_dest = dest.clone();
            let timer_key = key.clone();
            let timer = tokio::spawn(async move {
                tokio::select! {
                    () = tokio::time::sleep(deadline) => {
                        timer_token.cancel();
                        bus.publish(
                            Event::now(EventKind::DeadlineHit)
                                .with_destination(timer_dest.as_str())
                                .with_key(timer_key.as_str()),
                        );
                    }
                    () = timer_token.cancelled() => {}
                }
            });
            timer_id = Some(st.handles.register_timer(timer));
        }

        // The record exists: presence was checked on entry and the lock has
        // been held since.
        let mut op_seq = 0;
        if let Some(d) = st.destinations.get_mut(dest) {
            d.seq += 1;
            op_seq = d.seq;
            d.cancel = Some((cancel_id, token.clone()));
            d.current_key = Some(key.clone());
            d.deadline = timer_id;
            // Owning a fresh operation ends any piggyback.
            d.retry_armed = false;
        }

        st.pending.insert(key.clone());
        self.bus.publish(
            Event::now(EventKind::FetchStarted)
                .with_destination(dest.as_str())
                .with_key(key.as_str())
                .with_op_seq(op_seq),
        );
        drop(st);

        let flight = Flight {
            destination: dest.clone(),
            key,
            op_seq,
            cancel_id,
            timer_id,
            token: token.clone(),
        };
        let engine = Arc::clone(self);
        let producer = Arc::clone(&self.producer);
        let state = self.state.clone();
        let _ = tokio::spawn(async move {
            let result = producer.fetch(params, token, state).await;
            engine.settle(flight, result).await;
        });
    }

    /// Applies one operation's outcome and releases its resources.
    async fn settle(self: &Arc<Self>, flight: Flight, result: Result<Value, FetchError>) {
        let mut st = self.inner.lock().await;

        let apply = match result {
            Ok(value) => {
                if flight.token.is_cancelled() {
                    self.bus.publish(
                        Event::now(EventKind::FetchDiscarded)
                            .with_destination(flight.destination.as_str())
                            .with_key(flight.key.as_str())
                            .with_reason("cancelled"),
                    );
                    None
                } else if self.cfg.latest_only
                    && st
                        .destinations
                        .get(&flight.destination)
                        .is_some_and(|d| d.seq > flight.op_seq)
                {
                    // Latest-only ordering: the most recently started request
                    // for a destination wins, regardless of completion order.
                    self.bus.publish(
                        Event::now(EventKind::FetchDiscarded)
                            .with_destination(flight.destination.as_str())
                            .with_key(flight.key.as_str())
                            .with_reason("superseded")
                            .with_op_seq(flight.op_seq),
                    );
                    None
                } else {
                    Some(value)
                }
            }
            Err(err) => {
                // Swallowed: no output change, no propagation. Error
                // visibility is the operation implementer's responsibility.
                self.bus.publish(
                    Event::now(EventKind::FetchFailed)
                        .with_destination(flight.destination.as_str())
                        .with_key(flight.key.as_str())
                        .with_reason(err.as_message()),
                );
                None
            }
        };

        // Cache before waking observers so piggy-backed destinations
        // re-checking the cache see the result.
        if let Some(value) = &apply {
            if self.cfg.cache_enabled() {
                self.cache
                    .set(flight.key.clone(), value.clone(), self.cfg.cache_ttl);
            }
        }

        // Release this operation's handles (not any newer operation's).
        st.handles.remove_cancel(flight.cancel_id);
        if let Some(id) = flight.timer_id {
            st.handles.abort_timer(id);
        }
        if let Some(d) = st.destinations.get_mut(&flight.destination) {
            if d.cancel.as_ref().is_some_and(|(id, _)| *id == flight.cancel_id) {
                d.cancel = None;
            }
            if flight.timer_id.is_some() && d.deadline == flight.timer_id {
                d.deadline = None;
            }
        }

        if let Some(value) = &apply {
            self.bus.publish(
                Event::now(EventKind::FetchCompleted)
                    .with_destination(flight.destination.as_str())
                    .with_key(flight.key.as_str())
                    .with_op_seq(flight.op_seq),
            );
            self.broadcast(&mut st, &flight.key, value).await;
        }

        st.pending.settle(&flight.key);
    }

    /// Runs when an adopted (piggy-backed) operation settles.
    ///
    /// The latch is consumed here either way. A cache hit broadcasts like any
    /// cache hit; a miss with the latch still armed, the destination still
    /// resolving to the adopted key, and no new operation pending re-kicks
    /// with `force_refetch = true` — the single automatic retry.
    async fn adopt_settled(self: &Arc<Self>, dest: &DestinationId, key: &RequestKey) {
        let retry = {
            let mut st = self.inner.lock().await;
            if !st.destinations.contains(dest) {
                return;
            }

            let armed = st.destinations.get(dest).is_some_and(|d| d.retry_armed);
            if let Some(d) = st.destinations.get_mut(dest) {
                d.retry_armed = false;
            }

            if self.cfg.cache_enabled() {
                if let Some(value) = self.cache.get(key) {
                    self.bus.publish(
                        Event::now(EventKind::CacheHit)
                            .with_destination(dest.as_str())
                            .with_key(key.as_str()),
                    );
                    self.broadcast(&mut st, key, &value).await;
                    return;
                }
            }

            // Retry only what was piggy-backed: a destination that has moved
            // to another key since adopting gets nothing here.
            let still_current = self
                .resolver
                .resolve(dest)
                .and_then(|p| self.producer.request_key(&p, &self.state))
                .is_some_and(|k| k == *key);

            if armed && still_current && !st.pending.contains(key) {
                self.bus.publish(
                    Event::now(EventKind::RetryScheduled)
                        .with_destination(dest.as_str())
                        .with_key(key.as_str()),
                );
                true
            } else {
                false
            }
        };

        if retry {
            self.kickoff(dest, true).await;
        }
    }

    /// Publishes one outcome to every destination whose freshly resolved key
    /// equals `key`, stamping each one's current key.
    async fn broadcast(&self, st: &mut EngineState, key: &RequestKey, value: &Value) {
        for id in st.destinations.ids() {
            let Some(params) = self.resolver.resolve(&id) else {
                continue;
            };
            if self.producer.request_key(&params, &self.state).as_ref() != Some(key) {
                continue;
            }
            let updates = self.producer.map_updates(&params, value, &self.state);
            let _ = self.publisher.publish(&updates, Some(&id)).await;
            if let Some(d) = st.destinations.get_mut(&id) {
                d.current_key = Some(key.clone());
            }
        }
    }

    /// Cancels the destination's in-flight operation and clears its deadline
    /// timer, releasing both from the flat registry.
    pub(super) fn abort_inflight(st: &mut EngineState, dest: &DestinationId) {
        let Some(d) = st.destinations.get_mut(dest) else {
            return;
        };
        let cancel = d.cancel.take();
        let deadline = d.deadline.take();
        if let Some((id, token)) = cancel {
            token.cancel();
            st.handles.remove_cancel(id);
        }
        if let Some(id) = deadline {
            st.handles.abort_timer(id);
        }
    }
}
