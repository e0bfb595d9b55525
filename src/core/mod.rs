//! Core types shared by breakers and the registry.
//!
//! - [`error`] - Blocked-call and configuration errors
//! - [`clock`] - Monotonic time sources

pub mod clock;
pub mod error;
pub(crate) mod millis;

pub use clock::{ArcClock, Clock, ManualClock, MonotonicClock};
#[cfg(feature = "tokio-runtime")]
pub use clock::TokioClock;
pub use error::{BlockReason, BlockedCall, CallError, CallResult, ConfigError, ConfigResult};
