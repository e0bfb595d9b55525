//! Structured events for breaker activity.
//!
//! Events are emitted through `tracing` under the `faultgate::events` target,
//! each carrying an `event_type` field. Any subscriber (JSON logs,
//! OpenTelemetry, a metrics bridge) can pick them up; the library itself
//! installs none.

mod emit;

pub use emit::{
    emit_breaker_reset, emit_call_rejected, emit_health_summary, emit_state_transition,
    BreakerEvent, TransitionCause, TransitionEvent,
};
