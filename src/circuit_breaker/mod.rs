//! Per-endpoint circuit breakers.
//!
//! The circuit breaker pattern prevents cascading failures by temporarily
//! stopping traffic to a failing dependency and cautiously probing it to
//! detect recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through.
//! - **Open**: Dependency is failing; calls are rejected immediately.
//! - **Half-Open**: A bounded number of probe calls test for recovery.
//!
//! ## Transitions
//!
//! ```text
//! Closed   -> Open:     failure_count reaches failure_threshold
//! Open     -> HalfOpen: recovery_timeout elapsed since last failure,
//!                       checked when a call is attempted
//! HalfOpen -> Open:     any probe fails
//! HalfOpen -> Closed:   success_count reaches success_threshold
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use faultgate::circuit_breaker::{Breaker, BreakerConfig};
//! use std::time::Duration;
//!
//! let config = BreakerConfig::default()
//!     .with_failure_threshold(5)
//!     .with_recovery_timeout(Duration::from_secs(30));
//!
//! let breaker = Breaker::new("search-api", config);
//! let hits = breaker.execute(|| client.search("rust")).await?;
//! ```

mod breaker;
mod config;
mod state;

pub use breaker::{Breaker, CallPermit};
pub use config::{BreakerConfig, BreakerConfigOverride};
pub use state::{BreakerStats, CircuitState};
