//! Engine observability: event types and broadcast bus.
//!
//! The engine reports every meaningful transition of the orchestration pass
//! (fetch started/settled, cache hits, dedup piggybacks, retries, deadline
//! hits, lifecycle changes) as an [`Event`] on a broadcast [`Bus`]. Event
//! publishing is fire-and-forget: it never blocks the pass and a missing
//! subscriber drops events silently.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! Value delivery to consumers is a separate concern handled by the host
//! graph's [`Publish`](crate::host::Publish) fan-out; this bus carries only
//! engine-internal observability.

mod bus;
mod event;

#[cfg(feature = "logging")]
mod log;

pub use bus::Bus;
pub use event::{Event, EventKind};

#[cfg(feature = "logging")]
pub use log::LogWriter;
