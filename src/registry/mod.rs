//! Registry of breakers keyed by endpoint.
//!
//! The `BreakerRegistry` lazily creates one breaker per endpoint id, routes
//! calls to it, and aggregates statistics and health across endpoints.

mod breaker_registry;
mod health;

pub use breaker_registry::{BreakerRegistry, RegistryBuilder};
pub use health::HealthSummary;
