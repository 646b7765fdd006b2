//! # fetchvisor
//!
//! Reactive fetch orchestration: one engine supervises the request lifecycle
//! of a single data producer across many connected destinations, with
//! request-key dedup, TTL+LRU caching, cancellation, deadlines, latest-only
//! ordering, and bulk teardown.
//!
//! ```text
//!                         ┌────────────────────────────┐
//!   connect / disconnect  │           Engine           │
//!   params changed  ─────►│  kickoff ─ settle ─ bcast  │────► Publish
//!   produce / write_state │   (one lock, one pass)     │      (host outputs)
//!                         └──────┬──────────┬──────────┘
//!                                │          │
//!                  ResolveParams │          │ Producer
//!                  (param graph) │          │ (key / fetch / map)
//!                                ▼          ▼
//!                         ┌──────────┐ ┌──────────┐      ┌───────────┐
//!                         │ dest tbl │ │ pending  │      │ValueCache │
//!                         │ seq/key  │ │ per-key  │      │ TTL + LRU │
//!                         └──────────┘ └──────────┘      └───────────┘
//! ```
//!
//! ## Orchestration rules
//! - Per request key, at most one operation is in flight; destinations that
//!   resolve to a pending key adopt that operation ([`Producer::request_key`]
//!   defines identity).
//! - A live cache entry answers a kickoff without fetching; results are
//!   broadcast to **every** destination sharing the key.
//! - Per destination, the most recently started operation wins; superseded
//!   and cancelled results are discarded, failures are swallowed.
//! - A piggy-backed destination whose adopted operation settles without a
//!   cacheable result retries once, automatically.
//! - Disconnect cancels one destination's work; detach releases everything.
//!
//! ## Example
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use fetchvisor::{
//!     DestinationId, Engine, EngineConfig, FnProducer, MapResolver, ParamBag,
//!     RequestKey, Updates,
//! };
//!
//! let producer = FnProducer::arc(
//!     FnProducer::builder()
//!         .key_fn(|params, _| {
//!             let symbol = params.get("symbol")?.as_str()?;
//!             Some(RequestKey::from(format!("quote:{symbol}")))
//!         })
//!         .fetch_fn(|params, _cancel, _state| async move {
//!             Ok(json!({ "last": 42.5 }))
//!         })
//!         .map_fn(|_, result, _| Updates::single("last", result["last"].clone())),
//! );
//!
//! let resolver = Arc::new(MapResolver::new());
//! resolver.set("chart-1", ParamBag::new().with("symbol", json!("ACME")));
//!
//! let engine = Engine::builder(EngineConfig::default())
//!     .with_producer(producer)
//!     .with_resolver(Arc::clone(&resolver) as _)
//!     .with_publisher(publisher)
//!     .build()?;
//!
//! engine.on_connect(&DestinationId::from("chart-1")).await;
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod producers;
pub mod state;
pub mod types;

pub use cache::{MemoryCache, ValueCache};
pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder, EngineSnapshot};
pub use error::{EngineError, FetchError};
pub use events::{Bus, Event, EventKind};
pub use host::{MapResolver, Publish, ResolveParams};
pub use producers::{FnProducer, FnProducerBuilder, Producer};
pub use state::StateHandle;
pub use types::{DestinationId, ParamBag, RequestKey, Updates};

#[cfg(feature = "logging")]
pub use events::LogWriter;
