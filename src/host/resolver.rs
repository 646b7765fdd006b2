//! # Parameter resolution.
//!
//! [`ResolveParams`] is the engine's read-only view into the host graph's
//! scoping tree: given a destination, return its currently resolved
//! parameters, or `None` if the destination is gone or unresolvable.
//!
//! Resolution is synchronous with respect to the triggering event — the
//! engine calls it from inside an orchestration pass, once per destination
//! per pass (including one call per connected destination during a broadcast
//! pass). Implementations should be cheap and must not call back into the
//! engine.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{DestinationId, ParamBag};

/// Resolves a destination's current parameters.
pub trait ResolveParams: Send + Sync + 'static {
    /// Returns the destination's resolved parameters, or `None` if the
    /// destination is unknown or currently unresolvable.
    fn resolve(&self, destination: &DestinationId) -> Option<ParamBag>;
}

/// In-memory resolver backed by a destination → parameters map.
///
/// Useful for hosts with static wiring and for tests: set a destination's
/// parameters with [`MapResolver::set`], drop them with
/// [`MapResolver::clear`], then notify the engine via its parameter-change
/// hooks.
#[derive(Debug, Default)]
pub struct MapResolver {
    params: RwLock<HashMap<DestinationId, ParamBag>>,
}

impl MapResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parameters for `destination`, replacing any previous bag.
    pub fn set(&self, destination: impl Into<DestinationId>, params: ParamBag) {
        let _ = self.params.write().insert(destination.into(), params);
    }

    /// Removes the parameters for `destination` (it becomes unresolvable).
    pub fn clear(&self, destination: &DestinationId) {
        let _ = self.params.write().remove(destination);
    }
}

impl ResolveParams for MapResolver {
    fn resolve(&self, destination: &DestinationId) -> Option<ParamBag> {
        self.params.read().get(destination).cloned()
    }
}
