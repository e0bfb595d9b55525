//! Event types and emission functions.

use crate::circuit_breaker::CircuitState;
use crate::core::BlockedCall;
use crate::registry::HealthSummary;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base trait for breaker events.
pub trait BreakerEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the wall-clock time of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// What caused a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// Failures while closed reached the failure threshold.
    FailureThreshold,
    /// An admission check found the recovery timeout elapsed.
    RecoveryTimeoutElapsed,
    /// A probe failed while half-open.
    ProbeFailed,
    /// A probe was admitted but never reported an outcome.
    ProbeAbandoned,
    /// Probe successes reached the success threshold.
    ProbesSucceeded,
    /// The state was set by `force_state`.
    Forced,
}

impl TransitionCause {
    /// Returns the snake_case name of the cause.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FailureThreshold => "failure_threshold",
            Self::RecoveryTimeoutElapsed => "recovery_timeout_elapsed",
            Self::ProbeFailed => "probe_failed",
            Self::ProbeAbandoned => "probe_abandoned",
            Self::ProbesSucceeded => "probes_succeeded",
            Self::Forced => "forced",
        }
    }
}

/// A state transition of one breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Endpoint the breaker guards.
    pub endpoint: String,
    /// State before the transition.
    pub from: CircuitState,
    /// State after the transition.
    pub to: CircuitState,
    /// What triggered it.
    pub cause: TransitionCause,
    /// Failure count at the moment of the transition, after any reset.
    pub failure_count: u32,
    /// Transition count including this one.
    pub state_change_count: u64,
    /// Wall-clock time of the transition.
    pub timestamp: DateTime<Utc>,
}

impl BreakerEvent for TransitionEvent {
    fn event_type(&self) -> &'static str {
        "state_transition"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an event for a state transition.
///
/// Transitions into `Open` are logged at warn level, everything else at info.
pub fn emit_state_transition(event: &TransitionEvent) {
    if event.to.is_open() {
        tracing::warn!(
            target: "faultgate::events",
            event_type = event.event_type(),
            endpoint = %event.endpoint,
            from = %event.from,
            to = %event.to,
            cause = event.cause.name(),
            failure_count = event.failure_count,
            state_change_count = event.state_change_count,
            "Circuit opened"
        );
    } else {
        tracing::info!(
            target: "faultgate::events",
            event_type = event.event_type(),
            endpoint = %event.endpoint,
            from = %event.from,
            to = %event.to,
            cause = event.cause.name(),
            failure_count = event.failure_count,
            state_change_count = event.state_change_count,
            "Circuit state changed"
        );
    }
}

/// Emits an event for a call rejected by the admission check.
pub fn emit_call_rejected(blocked: &BlockedCall) {
    tracing::debug!(
        target: "faultgate::events",
        event_type = "call_rejected",
        endpoint = %blocked.endpoint,
        state = %blocked.state,
        reason = %blocked.reason,
        "Call blocked by circuit breaker"
    );
}

/// Emits an event for a breaker restored to its initial condition.
pub fn emit_breaker_reset(endpoint: &str, previous: CircuitState) {
    tracing::info!(
        target: "faultgate::events",
        event_type = "breaker_reset",
        endpoint = %endpoint,
        previous_state = %previous,
        "Circuit breaker reset"
    );
}

/// Emits an event summarizing the health of every tracked endpoint.
pub fn emit_health_summary(summary: &HealthSummary) {
    tracing::info!(
        target: "faultgate::events",
        event_type = "health_summary",
        total = summary.total,
        healthy = summary.healthy,
        unhealthy = summary.unhealthy,
        closed = summary.closed,
        open = summary.open,
        half_open = summary.half_open,
        overall_availability = summary.overall_availability,
        unhealthy_endpoints = ?summary.unhealthy_endpoints,
        "Circuit breaker health summary"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(to: CircuitState) -> TransitionEvent {
        TransitionEvent {
            endpoint: "inventory".into(),
            from: CircuitState::Closed,
            to,
            cause: TransitionCause::FailureThreshold,
            failure_count: 5,
            state_change_count: 1,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_transition_event_type() {
        let event = event(CircuitState::Open);
        assert_eq!(event.event_type(), "state_transition");
        assert_eq!(BreakerEvent::timestamp(&event), event.timestamp);
    }

    #[test]
    fn test_transition_event_serializes() {
        let json = serde_json::to_value(event(CircuitState::Open)).unwrap();
        assert_eq!(json["endpoint"], "inventory");
        assert_eq!(json["from"], "closed");
        assert_eq!(json["to"], "open");
        assert_eq!(json["cause"], "failure_threshold");
    }

    #[test]
    fn test_cause_names_match_serde() {
        for cause in [
            TransitionCause::FailureThreshold,
            TransitionCause::RecoveryTimeoutElapsed,
            TransitionCause::ProbeFailed,
            TransitionCause::ProbeAbandoned,
            TransitionCause::ProbesSucceeded,
            TransitionCause::Forced,
        ] {
            let json = serde_json::to_value(cause).unwrap();
            assert_eq!(json, cause.name());
        }
    }

    #[test]
    fn test_emit_functions_without_subscriber() {
        emit_state_transition(&event(CircuitState::Open));
        emit_state_transition(&event(CircuitState::HalfOpen));
        emit_breaker_reset("inventory", CircuitState::Open);
        emit_health_summary(&HealthSummary::default());
    }
}
