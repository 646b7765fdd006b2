//! # Core identifier and payload types.
//!
//! This module defines the small vocabulary shared across the engine:
//!
//! - [`DestinationId`] — stable identity of one subscriber context.
//! - [`RequestKey`] — opaque string summarizing the parameters relevant to one
//!   fetch; equal keys denote equivalent requests.
//! - [`ParamBag`] — the resolved parameters for one destination.
//! - [`Updates`] — output-id → value map produced for publication.
//!
//! Values are [`serde_json::Value`]: the engine never interprets them, it only
//! moves them between the fetch function, the cache, and the publisher.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identity of one destination (subscriber context).
///
/// Cheap to clone (interned string). Within one engine the host must keep ids
/// stable across events it wants treated as the same destination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(Arc<str>);

impl DestinationId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DestinationId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for DestinationId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque request key computed from a destination's resolved parameters.
///
/// Equal keys are equivalent requests: they share one in-flight operation and
/// one cache entry. An absent key (the key function returned `None`) means
/// "parameters insufficient" and starts no operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(Arc<str>);

impl RequestKey {
    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestKey {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for RequestKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved parameters for one destination.
///
/// Construction and interpretation of parameters belong to the host graph;
/// the engine only hands the bag to the key/fetch/mapper functions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamBag(HashMap<String, Value>);

impl ParamBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Inserts a parameter, returning the bag for chaining.
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        let _ = self.0.insert(name.into(), value);
        self
    }

    /// Inserts a parameter in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let _ = self.0.insert(name.into(), value);
    }

    /// True if the bag holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of parameters in the bag.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, Value)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Output updates produced for publication: output id → value.
///
/// Mapped and reset updates are published as produced, even when empty;
/// only the optional first-connect initial publish is skipped when the
/// producer has no initial values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Updates(HashMap<String, Value>);

impl Updates {
    /// Creates an empty update set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an update set with a single output.
    pub fn single(output: impl Into<String>, value: Value) -> Self {
        Self::new().with(output, value)
    }

    /// Adds an output value, returning the set for chaining.
    pub fn with(mut self, output: impl Into<String>, value: Value) -> Self {
        let _ = self.0.insert(output.into(), value);
        self
    }

    /// Returns the value for `output`, if present.
    pub fn get(&self, output: &str) -> Option<&Value> {
        self.0.get(output)
    }

    /// True if no outputs are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(output, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Updates {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
