//! Error types for the Verdant call-execution core.
//!
//! Every thunk handed to [`crate::RetryPolicy::execute`] resolves with a
//! [`CallError`] on failure, regardless of which provider it was talking to.
//! Call sites construct the variant that matches what the provider reported;
//! deciding what the failure *means* (retry, give up, stop the process) is
//! the job of [`classify`](crate::classify::classify), not of the call site.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for operations that can fail with a [`CallError`].
pub type Result<T> = std::result::Result<T, CallError>;

/// Failure of a single external call.
///
/// The variants mirror the failure classes the pipeline's providers actually
/// produce: HTTP-style status failures, network-level connection failures,
/// wall-clock budget exhaustion raised by the executor itself, explicit
/// quota exhaustion, and free-form upstream failure text that only phrase
/// matching can make sense of.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// Provider returned an HTTP-style status failure.
    #[error("provider returned status {status}: {message}")]
    Status {
        /// Status code reported by the provider
        status: u16,
        /// Error message from the provider
        message: String,
    },

    /// Network-level connection failure.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The whole-call wall-clock budget was exhausted.
    ///
    /// Raised by the retry executor, never by a thunk. Terminal for the
    /// current call but kept distinct from other fatal failures in logs.
    #[error("call budget of {budget:?} exhausted after {elapsed:?}")]
    TimeoutExceeded {
        /// The configured overall budget
        budget: Duration,
        /// Wall-clock time elapsed when the budget fired
        elapsed: Duration,
    },

    /// Provider reported its quota as exhausted.
    ///
    /// Retrying cannot help within any reasonable horizon; see
    /// [`crate::QuotaAction`] for how the executor reacts.
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Free-form failure text from an upstream provider.
    ///
    /// Used when the provider gives nothing more structured than a message.
    /// Classification happens by phrase matching in [`crate::classify`].
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Invalid policy or environment configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CallError {
    /// The HTTP-style status code, if this failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure was raised by the executor's wall-clock budget.
    pub fn is_timeout_exceeded(&self) -> bool {
        matches!(self, CallError::TimeoutExceeded { .. })
    }
}
