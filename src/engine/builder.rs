//! # Engine construction.
//!
//! [`EngineBuilder`] wires an [`Engine`] from its collaborators. The
//! producer, resolver, and publisher are required; cache, state, and bus fall
//! back to defaults derived from the configuration.

use std::sync::Arc;

use crate::cache::{MemoryCache, ValueCache};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::Bus;
use crate::host::{Publish, ResolveParams};
use crate::producers::Producer;
use crate::state::StateHandle;

use super::core::Engine;

/// Builder for [`Engine`].
///
/// # Example
/// ```ignore
/// let engine = Engine::builder(EngineConfig::default())
///     .with_producer(producer)
///     .with_resolver(resolver)
///     .with_publisher(publisher)
///     .build()?;
/// ```
pub struct EngineBuilder {
    cfg: EngineConfig,
    producer: Option<Arc<dyn Producer>>,
    resolver: Option<Arc<dyn ResolveParams>>,
    publisher: Option<Arc<dyn Publish>>,
    cache: Option<Arc<dyn ValueCache>>,
    state: Option<StateHandle>,
}

impl EngineBuilder {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            producer: None,
            resolver: None,
            publisher: None,
            cache: None,
            state: None,
        }
    }

    /// Sets the producer (required).
    pub fn with_producer(mut self, producer: Arc<dyn Producer>) -> Self {
        self.producer = Some(producer);
        self
    }

    /// Sets the parameter resolver (required).
    pub fn with_resolver(mut self, resolver: Arc<dyn ResolveParams>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the output publisher (required).
    pub fn with_publisher(mut self, publisher: Arc<dyn Publish>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Replaces the default in-memory cache.
    pub fn with_cache(mut self, cache: Arc<dyn ValueCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replaces the default empty local state (e.g. to share state between
    /// engines or pre-seed entries).
    pub fn with_state(mut self, state: StateHandle) -> Self {
        self.state = Some(state);
        self
    }

    /// Builds the engine.
    ///
    /// Fails with [`EngineError::MissingCollaborator`] when the producer,
    /// resolver, or publisher was not provided.
    pub fn build(self) -> Result<Arc<Engine>, EngineError> {
        let producer = self
            .producer
            .ok_or(EngineError::MissingCollaborator { what: "producer" })?;
        let resolver = self
            .resolver
            .ok_or(EngineError::MissingCollaborator { what: "resolver" })?;
        let publisher = self
            .publisher
            .ok_or(EngineError::MissingCollaborator { what: "publisher" })?;

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::new(self.cfg.cache_capacity_clamped())));
        let state = self.state.unwrap_or_default();
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        Ok(Arc::new(Engine::new_internal(
            self.cfg, producer, resolver, publisher, cache, state, bus,
        )))
    }
}
