//! # Engine: reactive fetch orchestration.
//!
//! Submodules:
//! - [`core`]: the [`Engine`] itself (kickoff, settlement, broadcast)
//! - [`lifecycle`]: host-facing hooks (connect/disconnect/detach, parameter
//!   changes, explicit produce, state writes)
//! - [`builder`]: [`EngineBuilder`]
//! - [`destinations`]: per-destination request state
//! - [`pending`]: single-flight pending-operation table
//! - [`registry`]: flat registry of live cancel handles and timers

mod builder;
mod core;
mod destinations;
mod lifecycle;
mod pending;
mod registry;

#[cfg(test)]
mod tests;

pub use builder::EngineBuilder;
pub use core::{Engine, EngineSnapshot};
