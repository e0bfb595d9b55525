//! Circuit breaker configuration.

use crate::core::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker.
///
/// Fixed at construction; a breaker never changes its configuration.
/// Durations serialize as integer milliseconds under `*_ms` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Number of failures while closed before opening the circuit.
    pub failure_threshold: u32,

    /// How long to stay open, measured from the last failure, before a probe
    /// is admitted.
    #[serde(rename = "recovery_timeout_ms", with = "crate::core::millis::duration")]
    pub recovery_timeout: Duration,

    /// Number of probe successes in half-open state to close the circuit.
    pub success_threshold: u32,

    /// Age after which failure counts recorded while closed are discarded.
    #[serde(rename = "monitoring_period_ms", with = "crate::core::millis::duration")]
    pub monitoring_period: Duration,

    /// Maximum number of probes admitted per half-open episode.
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            monitoring_period: Duration::from_secs(120),
            half_open_max_calls: 3,
        }
    }
}

impl BreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the recovery timeout.
    pub fn with_recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = timeout;
        self
    }

    /// Sets the success threshold.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Sets the monitoring period.
    pub fn with_monitoring_period(mut self, period: Duration) -> Self {
        self.monitoring_period = period;
        self
    }

    /// Sets the maximum number of half-open probes.
    pub fn with_half_open_max_calls(mut self, max: u32) -> Self {
        self.half_open_max_calls = max;
        self
    }

    /// Creates a configuration for dependencies where failing fast matters
    /// more than availability.
    ///
    /// This configuration:
    /// - Opens after 3 failures
    /// - Stays open for 2 minutes
    /// - Needs 3 of at most 3 probes to succeed before closing
    pub fn strict() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(120),
            success_threshold: 3,
            monitoring_period: Duration::from_secs(300),
            half_open_max_calls: 3,
        }
    }

    /// Creates a configuration for dependencies that should be retried early.
    ///
    /// This configuration:
    /// - Tolerates 10 failures
    /// - Stays open for 10 seconds
    /// - Closes after 2 successful probes, allowing up to 5
    pub fn high_availability() -> Self {
        Self {
            failure_threshold: 10,
            recovery_timeout: Duration::from_secs(10),
            success_threshold: 2,
            monitoring_period: Duration::from_secs(60),
            half_open_max_calls: 5,
        }
    }

    /// Checks that a breaker built from this configuration can make progress.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroValue`] if a threshold or the probe quota is zero.
    /// - [`ConfigError::UnreachableSuccessThreshold`] if more probe successes
    ///   are required than probes are admitted; such a breaker would stay
    ///   half-open forever.
    pub fn validate(&self) -> ConfigResult<()> {
        let counts = [
            ("failure_threshold", self.failure_threshold),
            ("success_threshold", self.success_threshold),
            ("half_open_max_calls", self.half_open_max_calls),
        ];
        if let Some(&(field, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroValue { field });
        }

        if self.success_threshold > self.half_open_max_calls {
            return Err(ConfigError::UnreachableSuccessThreshold {
                success_threshold: self.success_threshold,
                half_open_max_calls: self.half_open_max_calls,
            });
        }

        Ok(())
    }
}

/// Per-endpoint adjustments layered over a default [`BreakerConfig`].
///
/// Every field is optional; fields left `None` keep the default's value.
///
/// ```rust
/// use faultgate::circuit_breaker::{BreakerConfig, BreakerConfigOverride};
///
/// let merged = BreakerConfigOverride::new()
///     .failure_threshold(2)
///     .merge_onto(&BreakerConfig::default());
///
/// assert_eq!(merged.failure_threshold, 2);
/// assert_eq!(merged.success_threshold, 3);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfigOverride {
    /// Replacement failure threshold.
    pub failure_threshold: Option<u32>,

    /// Replacement recovery timeout.
    #[serde(rename = "recovery_timeout_ms", with = "crate::core::millis::option_duration")]
    pub recovery_timeout: Option<Duration>,

    /// Replacement success threshold.
    pub success_threshold: Option<u32>,

    /// Replacement monitoring period.
    #[serde(rename = "monitoring_period_ms", with = "crate::core::millis::option_duration")]
    pub monitoring_period: Option<Duration>,

    /// Replacement probe quota.
    pub half_open_max_calls: Option<u32>,
}

impl BreakerConfigOverride {
    /// Creates an override that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the failure threshold.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    /// Overrides the recovery timeout.
    pub fn recovery_timeout(mut self, timeout: Duration) -> Self {
        self.recovery_timeout = Some(timeout);
        self
    }

    /// Overrides the success threshold.
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    /// Overrides the monitoring period.
    pub fn monitoring_period(mut self, period: Duration) -> Self {
        self.monitoring_period = Some(period);
        self
    }

    /// Overrides the probe quota.
    pub fn half_open_max_calls(mut self, max: u32) -> Self {
        self.half_open_max_calls = Some(max);
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies this override field by field; set fields win.
    pub fn merge_onto(&self, base: &BreakerConfig) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold.unwrap_or(base.failure_threshold),
            recovery_timeout: self.recovery_timeout.unwrap_or(base.recovery_timeout),
            success_threshold: self.success_threshold.unwrap_or(base.success_threshold),
            monitoring_period: self.monitoring_period.unwrap_or(base.monitoring_period),
            half_open_max_calls: self
                .half_open_max_calls
                .unwrap_or(base.half_open_max_calls),
        }
    }
}

impl From<BreakerConfig> for BreakerConfigOverride {
    fn from(config: BreakerConfig) -> Self {
        Self {
            failure_threshold: Some(config.failure_threshold),
            recovery_timeout: Some(config.recovery_timeout),
            success_threshold: Some(config.success_threshold),
            monitoring_period: Some(config.monitoring_period),
            half_open_max_calls: Some(config.half_open_max_calls),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.recovery_timeout, Duration::from_secs(60));
        assert_eq!(config.success_threshold, 3);
        assert_eq!(config.monitoring_period, Duration::from_secs(120));
        assert_eq!(config.half_open_max_calls, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = BreakerConfig::new()
            .with_failure_threshold(10)
            .with_recovery_timeout(Duration::from_secs(5));

        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.recovery_timeout, Duration::from_secs(5));
        assert_eq!(config.success_threshold, 3);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(BreakerConfig::strict().validate().is_ok());
        assert!(BreakerConfig::high_availability().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = BreakerConfig::new().with_half_open_max_calls(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroValue {
                field: "half_open_max_calls"
            })
        );

        let config = BreakerConfig::new().with_failure_threshold(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroValue {
                field: "failure_threshold"
            })
        );
    }

    #[test]
    fn test_validate_rejects_unreachable_success_threshold() {
        let config = BreakerConfig::new()
            .with_success_threshold(4)
            .with_half_open_max_calls(2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnreachableSuccessThreshold {
                success_threshold: 4,
                half_open_max_calls: 2,
            })
        ));
    }

    #[test]
    fn test_override_merges_field_by_field() {
        let base = BreakerConfig::default();
        let merged = BreakerConfigOverride::new()
            .recovery_timeout(Duration::from_secs(1))
            .half_open_max_calls(1)
            .success_threshold(1)
            .merge_onto(&base);

        assert_eq!(merged.failure_threshold, base.failure_threshold);
        assert_eq!(merged.monitoring_period, base.monitoring_period);
        assert_eq!(merged.recovery_timeout, Duration::from_secs(1));
        assert_eq!(merged.half_open_max_calls, 1);
        assert_eq!(merged.success_threshold, 1);
    }

    #[test]
    fn test_empty_override_is_identity() {
        let base = BreakerConfig::strict();
        let over = BreakerConfigOverride::new();
        assert!(over.is_empty());
        assert_eq!(over.merge_onto(&base), base);
        assert_eq!(BreakerConfigOverride::from(base).merge_onto(&BreakerConfig::default()), base);
    }

    #[test]
    fn test_config_serializes_durations_as_millis() {
        let json = serde_json::to_value(BreakerConfig::default()).unwrap();
        assert_eq!(json["recovery_timeout_ms"], 60_000);
        assert_eq!(json["monitoring_period_ms"], 120_000);
        assert_eq!(json["failure_threshold"], 5);
    }

    #[test]
    fn test_override_deserializes_partial_input() {
        let over: BreakerConfigOverride =
            serde_json::from_str(r#"{"failure_threshold": 2, "recovery_timeout_ms": 1500}"#)
                .unwrap();

        assert_eq!(over.failure_threshold, Some(2));
        assert_eq!(over.recovery_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(over.success_threshold, None);
        assert_eq!(over.monitoring_period, None);
    }
}
