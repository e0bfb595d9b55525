//! Circuit breaker state machine types.

use crate::events::TransitionEvent;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// The externally visible state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through; failures are counted.
    Closed,
    /// Calls are rejected without reaching the dependency.
    Open,
    /// A bounded number of probe calls are let through.
    HalfOpen,
}

impl CircuitState {
    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }

    /// Returns `true` if the state is [`CircuitState::Closed`].
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the state is [`CircuitState::Open`].
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the state is [`CircuitState::HalfOpen`].
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen)
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal state, carrying the data that only exists in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Closed,
    Open,
    HalfOpen {
        /// Probes admitted in the current half-open episode.
        admitted: u32,
    },
}

impl Phase {
    pub(crate) fn entering(state: CircuitState) -> Self {
        match state {
            CircuitState::Closed => Self::Closed,
            CircuitState::Open => Self::Open,
            CircuitState::HalfOpen => Self::HalfOpen { admitted: 0 },
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        match self {
            Self::Closed => CircuitState::Closed,
            Self::Open => CircuitState::Open,
            Self::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub(crate) fn half_open_admitted(&self) -> u32 {
        match self {
            Self::HalfOpen { admitted } => *admitted,
            Self::Closed | Self::Open => 0,
        }
    }
}

/// Point-in-time snapshot of a breaker.
///
/// Timestamps are readings of the breaker's monotonic clock, not wall time;
/// compare them with each other or with `uptime`. The state is reported as
/// last stored: an open breaker whose recovery timeout has passed still
/// reads `Open` until the next admission check moves it to half-open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerStats {
    /// Endpoint the breaker guards.
    pub endpoint: String,
    /// Identity of the breaker instance.
    pub instance_id: Uuid,
    /// Current state.
    pub state: CircuitState,
    /// Failures counted by the state machine.
    pub failure_count: u32,
    /// Successes counted by the state machine.
    pub success_count: u32,
    /// Admitted calls since construction or the last reset.
    pub total_calls: u64,
    /// Failed calls since construction or the last reset.
    pub total_failures: u64,
    /// Calls rejected by the admission check.
    pub rejected_calls: u64,
    /// Probes admitted in the current half-open episode.
    pub half_open_admitted: u32,
    /// When the last failure was recorded.
    #[serde(rename = "last_failure_ms", with = "crate::core::millis::option_duration")]
    pub last_failure_at: Option<Duration>,
    /// When the last success was recorded.
    #[serde(rename = "last_success_ms", with = "crate::core::millis::option_duration")]
    pub last_success_at: Option<Duration>,
    /// Number of state transitions, forced ones included.
    pub state_change_count: u64,
    /// Time since construction or the last reset.
    #[serde(rename = "uptime_ms", with = "crate::core::millis::duration")]
    pub uptime: Duration,
    /// Percentage of admitted calls that did not fail, 100 when idle.
    pub availability: f64,
    /// The most recent transition, if any.
    pub last_transition: Option<TransitionEvent>,
}

impl BreakerStats {
    /// Returns `true` if the breaker is closed.
    pub fn is_healthy(&self) -> bool {
        self.state.is_closed()
    }
}

/// Computes availability as a percentage in `[0, 100]`.
pub(crate) fn availability(total_calls: u64, total_failures: u64) -> f64 {
    if total_calls == 0 {
        return 100.0;
    }
    let succeeded = total_calls.saturating_sub(total_failures);
    succeeded as f64 / total_calls as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(CircuitState::Closed.name(), "closed");
        assert_eq!(CircuitState::Open.to_string(), "open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half_open");
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"half_open\"");
    }

    #[test]
    fn test_phase_entering_half_open_starts_empty() {
        let phase = Phase::entering(CircuitState::HalfOpen);
        assert_eq!(phase, Phase::HalfOpen { admitted: 0 });
        assert_eq!(phase.state(), CircuitState::HalfOpen);
        assert_eq!(Phase::HalfOpen { admitted: 2 }.half_open_admitted(), 2);
        assert_eq!(Phase::Open.half_open_admitted(), 0);
    }

    #[test]
    fn test_availability() {
        assert_eq!(availability(0, 0), 100.0);
        assert_eq!(availability(4, 1), 75.0);
        assert_eq!(availability(2, 2), 0.0);
        assert_eq!(availability(1, 5), 0.0);
    }
}
