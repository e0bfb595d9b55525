//! Error types for the faultgate library.
//!
//! A guarded call can fail in exactly two ways, and the caller must always be
//! able to tell them apart:
//!
//! - the breaker refused to admit the call ([`CallError::Blocked`]), in which
//!   case the operation was never invoked;
//! - the operation ran and returned its own error ([`CallError::Operation`]),
//!   which is handed back untouched.
//!
//! The library never panics; all errors are returned as `Result` values.

use crate::circuit_breaker::CircuitState;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Why an admission check rejected a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockReason {
    /// The breaker is open and the recovery timeout has not elapsed yet.
    RecoveryPending {
        /// Time left until the next call will be admitted as a probe.
        #[serde(rename = "retry_in_ms", with = "crate::core::millis::duration")]
        retry_in: Duration,
    },

    /// The breaker is half-open and every probe slot is taken.
    ProbeQuotaExhausted {
        /// The configured probe quota.
        max_probes: u32,
    },
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RecoveryPending { retry_in } => {
                write!(f, "recovery pending, retry in {retry_in:?}")
            }
            Self::ProbeQuotaExhausted { max_probes } => {
                write!(f, "all {max_probes} probe slots in use")
            }
        }
    }
}

/// A call that the breaker refused to admit.
///
/// Carries enough context for the caller to branch (fall back to a cache,
/// pick another endpoint) without reaching into breaker internals.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("circuit breaker for endpoint '{endpoint}' is {state}: call blocked ({reason})")]
pub struct BlockedCall {
    /// Endpoint the breaker guards.
    pub endpoint: String,
    /// State the breaker was in when it rejected the call.
    pub state: CircuitState,
    /// Why the call was rejected.
    pub reason: BlockReason,
}

impl BlockedCall {
    /// Returns the suggested wait before trying again, if the breaker knows it.
    pub fn retry_in(&self) -> Option<Duration> {
        match self.reason {
            BlockReason::RecoveryPending { retry_in } => Some(retry_in),
            BlockReason::ProbeQuotaExhausted { .. } => None,
        }
    }
}

/// The error returned by a guarded call.
///
/// `E` is the operation's own error type. It is moved into
/// [`CallError::Operation`] as-is, never converted or stringified.
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// The breaker rejected the call; the operation was not invoked.
    #[error(transparent)]
    Blocked(#[from] BlockedCall),

    /// The operation ran and failed.
    #[error(transparent)]
    Operation(E),
}

impl<E> CallError<E> {
    /// Returns `true` if the call never reached the operation.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    /// Returns the rejection details, if the call was blocked.
    pub fn blocked(&self) -> Option<&BlockedCall> {
        match self {
            Self::Blocked(blocked) => Some(blocked),
            Self::Operation(_) => None,
        }
    }

    /// Returns a reference to the operation's error, if it ran and failed.
    pub fn operation(&self) -> Option<&E> {
        match self {
            Self::Blocked(_) => None,
            Self::Operation(err) => Some(err),
        }
    }

    /// Consumes the error and returns the operation's error, if any.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Blocked(_) => None,
            Self::Operation(err) => Some(err),
        }
    }

    /// Maps the operation error, leaving a rejection untouched.
    pub fn map_operation<F, O>(self, f: O) -> CallError<F>
    where
        O: FnOnce(E) -> F,
    {
        match self {
            Self::Blocked(blocked) => CallError::Blocked(blocked),
            Self::Operation(err) => CallError::Operation(f(err)),
        }
    }
}

/// Error type for invalid breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A threshold or quota that must be at least one was zero.
    #[error("invalid breaker config: '{field}' must be greater than zero")]
    ZeroValue {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The breaker could never collect enough probe successes to close.
    #[error(
        "invalid breaker config: success_threshold ({success_threshold}) exceeds \
         half_open_max_calls ({half_open_max_calls})"
    )]
    UnreachableSuccessThreshold {
        /// Configured success threshold.
        success_threshold: u32,
        /// Configured probe quota.
        half_open_max_calls: u32,
    },
}

/// A specialized `Result` type for guarded calls.
pub type CallResult<T, E> = Result<T, CallError<E>>;

/// A specialized `Result` type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;
