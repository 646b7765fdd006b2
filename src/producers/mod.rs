//! # Producer strategies.
//!
//! A producer tells the engine how to turn parameters into work and work into
//! outputs. Variant configurations (single vs. multi-output, destination- vs.
//! home-scoped parameters, with or without local state) are **dimensions of
//! one engine**, expressed as one strategy object rather than separate engine
//! hierarchies:
//!
//! - [`Producer`] — the strategy trait (key, fetch, mapping, reset).
//! - [`FnProducer`] — closure-backed implementation with a fluent builder.

mod fn_producer;
mod producer;

pub use fn_producer::{FnProducer, FnProducerBuilder};
pub use producer::Producer;
