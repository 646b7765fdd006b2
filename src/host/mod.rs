//! # Host-graph integration points.
//!
//! The engine is embedded in a hosting resolution graph that knows which
//! producer serves which destination, how parameters are read, and how
//! produced values fan out to consumers. This module defines the two traits
//! the engine consumes from that graph:
//!
//! - [`ResolveParams`] — read a destination's current parameters.
//! - [`Publish`] — deliver output updates to consumers.
//!
//! [`MapResolver`] is a simple in-memory [`ResolveParams`] implementation for
//! hosts with static wiring and for tests.

mod publish;
mod resolver;

pub use publish::Publish;
pub use resolver::{MapResolver, ResolveParams};
