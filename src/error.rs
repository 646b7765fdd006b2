//! Error types used by the fetchvisor engine and fetch implementations.
//!
//! This module defines two error enums:
//!
//! - [`EngineError`] — errors raised while assembling an engine.
//! - [`FetchError`] — errors raised by individual fetch operations.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics. Fetch failures are **absorbed** at settlement: the engine
//! never propagates them to the output stream (see the crate docs for the
//! failure policy).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while constructing an engine.
///
/// The engine requires a producer, a parameter resolver, and a publisher;
/// building without one of them yields [`EngineError::MissingCollaborator`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// A required collaborator was not supplied to the builder.
    #[error("engine misconfigured: missing {what}")]
    MissingCollaborator {
        /// Name of the missing collaborator (`producer`, `resolver`, `publisher`).
        what: &'static str,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::MissingCollaborator { .. } => "engine_misconfigured",
        }
    }
}

/// # Errors produced by fetch operations.
///
/// A fetch either fails outright, is cancelled cooperatively, or runs out of
/// its deadline. All three settle the same way from the engine's point of
/// view: the pending entry is removed, waiters are released, and no output is
/// mutated. Implementers that want user-visible failure must encode it into a
/// successful result value instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FetchError {
    /// The operation failed. Swallowed by the engine; no output change.
    #[error("fetch failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The operation was cancelled (key change, disconnect, detach, deadline).
    #[error("fetch cancelled")]
    Canceled,

    /// The operation exceeded its configured deadline.
    ///
    /// Surfaces to the engine exactly like [`FetchError::Canceled`]; the
    /// distinct variant exists only for implementers that want to report it.
    #[error("deadline {deadline:?} exceeded")]
    Deadline {
        /// The deadline that was exceeded.
        deadline: Duration,
    },
}

impl FetchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fetchvisor::FetchError;
    ///
    /// let err = FetchError::Canceled;
    /// assert_eq!(err.as_label(), "fetch_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Failed { .. } => "fetch_failed",
            FetchError::Canceled => "fetch_canceled",
            FetchError::Deadline { .. } => "fetch_deadline",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FetchError::Failed { error } => format!("error: {error}"),
            FetchError::Canceled => "cancelled".to_string(),
            FetchError::Deadline { deadline } => format!("deadline exceeded: {deadline:?}"),
        }
    }

    /// True for the expected cancellation outcomes (cancel and deadline).
    ///
    /// The engine discards these silently; only [`FetchError::Failed`] is a
    /// genuine operation failure (also swallowed, but worth distinguishing in
    /// logs).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FetchError::Canceled | FetchError::Deadline { .. })
    }
}
