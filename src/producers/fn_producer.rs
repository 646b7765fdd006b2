//! # Closure-backed producer (`FnProducer`).
//!
//! [`FnProducer`] assembles a [`Producer`] from plain closures, so hosts and
//! tests can wire a producer without declaring a struct. The fetch closure
//! creates a **fresh** future per invocation, owning its own state; shared
//! state between invocations goes through `Arc` captures or the
//! [`StateHandle`].
//!
//! ## Example
//! ```
//! use serde_json::{Value, json};
//! use fetchvisor::{FnProducer, RequestKey, Updates};
//!
//! let producer = FnProducer::builder()
//!     .key_fn(|params, _state| {
//!         let symbol = params.get("symbol")?.as_str()?;
//!         Some(RequestKey::from(format!("quote:{symbol}")))
//!     })
//!     .fetch_fn(|_params, _cancel, _state| async move { Ok(json!({ "last": 42.5 })) })
//!     .map_fn(|_params, result, _state| Updates::single("last", result["last"].clone()))
//!     .reset_fn(|_params| Updates::single("last", Value::Null))
//!     .build();
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::state::StateHandle;
use crate::types::{ParamBag, RequestKey, Updates};

use super::Producer;

type KeyFn = dyn Fn(&ParamBag, &StateHandle) -> Option<RequestKey> + Send + Sync;
type FetchFn = dyn Fn(ParamBag, CancellationToken, StateHandle) -> BoxFuture<'static, Result<Value, FetchError>>
    + Send
    + Sync;
type MapFn = dyn Fn(&ParamBag, &Value, &StateHandle) -> Updates + Send + Sync;
type ResetFn = dyn Fn(&ParamBag) -> Updates + Send + Sync;
type InitialFn = dyn Fn(Option<&ParamBag>, &StateHandle) -> Updates + Send + Sync;

/// Producer assembled from closures. Build with [`FnProducer::builder`].
pub struct FnProducer {
    key: Box<KeyFn>,
    fetch: Box<FetchFn>,
    map: Box<MapFn>,
    reset: Box<ResetFn>,
    initial: Box<InitialFn>,
}

impl FnProducer {
    /// Starts a builder. `key_fn` and `fetch_fn` are required; mapping
    /// defaults to publishing the whole result under the `"value"` output,
    /// reset and initial updates default to empty.
    pub fn builder() -> FnProducerBuilder {
        FnProducerBuilder::default()
    }

    /// Builds and returns the producer as a shared handle.
    pub fn arc(builder: FnProducerBuilder) -> Arc<Self> {
        Arc::new(builder.build())
    }
}

#[async_trait]
impl Producer for FnProducer {
    fn request_key(&self, params: &ParamBag, state: &StateHandle) -> Option<RequestKey> {
        (self.key)(params, state)
    }

    async fn fetch(
        &self,
        params: ParamBag,
        cancel: CancellationToken,
        state: StateHandle,
    ) -> Result<Value, FetchError> {
        (self.fetch)(params, cancel, state).await
    }

    fn map_updates(&self, params: &ParamBag, result: &Value, state: &StateHandle) -> Updates {
        (self.map)(params, result, state)
    }

    fn reset_updates(&self, params: &ParamBag) -> Updates {
        (self.reset)(params)
    }

    fn initial_updates(&self, params: Option<&ParamBag>, state: &StateHandle) -> Updates {
        (self.initial)(params, state)
    }
}

/// Fluent builder for [`FnProducer`].
#[derive(Default)]
pub struct FnProducerBuilder {
    key: Option<Box<KeyFn>>,
    fetch: Option<Box<FetchFn>>,
    map: Option<Box<MapFn>>,
    reset: Option<Box<ResetFn>>,
    initial: Option<Box<InitialFn>>,
}

impl FnProducerBuilder {
    /// Sets the request-key function.
    pub fn key_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParamBag, &StateHandle) -> Option<RequestKey> + Send + Sync + 'static,
    {
        self.key = Some(Box::new(f));
        self
    }

    /// Sets the fetch function. The closure produces a fresh future per call.
    pub fn fetch_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ParamBag, CancellationToken, StateHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
    {
        self.fetch = Some(Box::new(move |params, cancel, state| {
            Box::pin(f(params, cancel, state))
        }));
        self
    }

    /// Sets the result-to-updates mapping function.
    pub fn map_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParamBag, &Value, &StateHandle) -> Updates + Send + Sync + 'static,
    {
        self.map = Some(Box::new(f));
        self
    }

    /// Sets the reset-updates function (published on insufficient parameters).
    pub fn reset_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&ParamBag) -> Updates + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(f));
        self
    }

    /// Sets the initial-updates function (published on first-ever connect).
    pub fn initial_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&ParamBag>, &StateHandle) -> Updates + Send + Sync + 'static,
    {
        self.initial = Some(Box::new(f));
        self
    }

    /// Builds the producer, filling unset optional functions with defaults.
    ///
    /// Unset required functions degrade safely: a missing key function never
    /// resolves a key (the engine only ever publishes resets), a missing
    /// fetch settles immediately as a failure.
    pub fn build(self) -> FnProducer {
        FnProducer {
            key: self.key.unwrap_or_else(|| Box::new(|_, _| None)),
            fetch: self.fetch.unwrap_or_else(|| {
                Box::new(|_, _, _| {
                    Box::pin(async { Err(FetchError::Failed { error: "no fetch function".into() }) })
                })
            }),
            map: self
                .map
                .unwrap_or_else(|| Box::new(|_, result, _| Updates::single("value", result.clone()))),
            reset: self.reset.unwrap_or_else(|| Box::new(|_| Updates::new())),
            initial: self.initial.unwrap_or_else(|| Box::new(|_, _| Updates::new())),
        }
    }
}
