//! # Faultgate
//!
//! Per-endpoint circuit breakers for calls to unreliable dependencies.
//!
//! ## Overview
//!
//! Faultgate wraps calls to a downstream operation, observes whether they
//! succeed, and decides per endpoint whether to let traffic through, block
//! it, or cautiously probe for recovery. It lets you:
//!
//! - Fail fast against a dependency that keeps failing
//! - Probe a recovering dependency with a bounded number of calls
//! - Keep one independent breaker per endpoint in a shared registry
//! - Tell blocked calls apart from the operation's own errors
//! - Read per-endpoint statistics and an aggregated health summary
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use faultgate::{BreakerConfigOverride, BreakerRegistry, CallError};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(BreakerRegistry::builder().build()?);
//!
//!     let quick_recovery = BreakerConfigOverride::new()
//!         .recovery_timeout(Duration::from_secs(5));
//!
//!     match registry
//!         .execute_with_override("rates-api", &quick_recovery, || fetch_rates())
//!         .await
//!     {
//!         Ok(rates) => println!("{rates:?}"),
//!         Err(CallError::Blocked(blocked)) => println!("serving cached rates: {blocked}"),
//!         Err(CallError::Operation(e)) => return Err(e.into()),
//!     }
//!
//!     println!("{:?}", registry.health_summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes tokio support
//! - `tokio-runtime` - Provides `TokioClock`, which follows tokio's paused
//!   test time
//!
//! ## Architecture
//!
//! - **Core**: Error types and time sources
//! - **Circuit Breaker**: The per-endpoint state machine
//! - **Registry**: Lazily created breakers keyed by endpoint, with health
//!   aggregation
//! - **Events**: Structured `tracing` events for transitions and rejections
//!
//! Retries, timeouts and rate limiting are deliberately left to the caller;
//! the breaker only reacts to the outcomes it observes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod circuit_breaker;
pub mod core;
pub mod events;
pub mod registry;

// Re-export commonly used types at the crate root
pub use crate::core::{
    BlockReason, BlockedCall, CallError, CallResult, Clock, ConfigError, ManualClock,
    MonotonicClock,
};

pub use crate::circuit_breaker::{
    Breaker, BreakerConfig, BreakerConfigOverride, BreakerStats, CallPermit, CircuitState,
};
pub use crate::registry::{BreakerRegistry, HealthSummary, RegistryBuilder};

/// Prelude module for convenient imports.
///
/// ```rust
/// use faultgate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::circuit_breaker::{
        Breaker, BreakerConfig, BreakerConfigOverride, BreakerStats, CircuitState,
    };
    pub use crate::core::{BlockedCall, CallError, CallResult, Clock};
    pub use crate::registry::{BreakerRegistry, HealthSummary};
}
