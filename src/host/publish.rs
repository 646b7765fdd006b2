//! # Value publication.
//!
//! [`Publish`] delegates delivery of produced values to the host graph's
//! fan-out mechanism. The engine decides *what* to publish and *to whom*
//! (a specific destination, or everyone for destination-less publishes);
//! routing, batching, and transport are host concerns.

use async_trait::async_trait;

use crate::types::{DestinationId, Updates};

/// Delivers output updates to consumers.
///
/// Called from inside an orchestration pass while engine state is locked:
/// implementations must not call back into the engine (deadlock) and should
/// hand off quickly rather than perform slow I/O inline.
#[async_trait]
pub trait Publish: Send + Sync + 'static {
    /// Publishes `updates`, scoped to one destination when `destination` is
    /// `Some`. Returns the number of notified consumers.
    async fn publish(&self, updates: &Updates, destination: Option<&DestinationId>) -> usize;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
