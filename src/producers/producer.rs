//! # Producer strategy trait.
//!
//! [`Producer`] bundles the caller-supplied functions the engine orchestrates:
//! key computation, the expensive fetch, result-to-output mapping, and reset
//! values for the "parameters insufficient" path.
//!
//! The fetch receives a [`CancellationToken`] and should observe it
//! cooperatively: cancellation signals the operation and makes the engine
//! ignore its result, but cannot forcibly terminate code that ignores the
//! token.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::state::StateHandle;
use crate::types::{ParamBag, RequestKey, Updates};

/// # Strategy for one value producer.
///
/// The engine guarantees: `fetch` is invoked at most once per distinct
/// request key at a time (single-flight), its successful result is mapped and
/// published to every destination whose current key matches, and its failure
/// is swallowed (encode user-visible failure into the result value if
/// needed).
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use serde_json::{Value, json};
/// use tokio_util::sync::CancellationToken;
/// use fetchvisor::{FetchError, ParamBag, Producer, RequestKey, StateHandle, Updates};
///
/// struct Quotes;
///
/// #[async_trait]
/// impl Producer for Quotes {
///     fn request_key(&self, params: &ParamBag, _state: &StateHandle) -> Option<RequestKey> {
///         let symbol = params.get("symbol")?.as_str()?;
///         Some(RequestKey::from(format!("quote:{symbol}")))
///     }
///
///     async fn fetch(
///         &self,
///         _params: ParamBag,
///         _cancel: CancellationToken,
///         _state: StateHandle,
///     ) -> Result<Value, FetchError> {
///         // call the quote service...
///         Ok(json!({ "last": 42.5 }))
///     }
///
///     fn map_updates(&self, _params: &ParamBag, result: &Value, _state: &StateHandle) -> Updates {
///         Updates::single("last", result["last"].clone())
///     }
///
///     fn reset_updates(&self, _params: &ParamBag) -> Updates {
///         Updates::single("last", Value::Null)
///     }
/// }
/// ```
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    /// Computes the request key for the given parameters and local state.
    ///
    /// `None` means "parameters insufficient": the engine cancels any
    /// in-flight operation for the destination and publishes
    /// [`reset_updates`](Producer::reset_updates) instead of starting work.
    fn request_key(&self, params: &ParamBag, state: &StateHandle) -> Option<RequestKey>;

    /// Performs the expensive/remote operation.
    ///
    /// Should observe `cancel` cooperatively and may return
    /// [`FetchError::Canceled`] when it does; any error settles the operation
    /// without mutating outputs.
    async fn fetch(
        &self,
        params: ParamBag,
        cancel: CancellationToken,
        state: StateHandle,
    ) -> Result<Value, FetchError>;

    /// Maps a successful fetch result to output updates for one destination.
    fn map_updates(&self, params: &ParamBag, result: &Value, state: &StateHandle) -> Updates;

    /// Output values published when parameters become insufficient.
    ///
    /// Defaults to no updates (previously published values stay visible).
    fn reset_updates(&self, params: &ParamBag) -> Updates {
        let _ = params;
        Updates::new()
    }

    /// Output values published once, unconditionally, when the producer gains
    /// its first-ever destination. Covers producers with no async dependency.
    ///
    /// Defaults to no updates.
    fn initial_updates(&self, params: Option<&ParamBag>, state: &StateHandle) -> Updates {
        let _ = (params, state);
        Updates::new()
    }
}
