//! The breaker registry implementation.

use crate::circuit_breaker::{Breaker, BreakerConfig, BreakerConfigOverride, BreakerStats};
use crate::core::{ArcClock, CallResult, Clock, ConfigResult, MonotonicClock};
use crate::registry::health::HealthSummary;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};

/// Builder for creating a `BreakerRegistry`.
pub struct RegistryBuilder {
    default_config: BreakerConfig,
    clock: Option<ArcClock>,
}

impl RegistryBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            default_config: BreakerConfig::default(),
            clock: None,
        }
    }

    /// Sets the configuration used for endpoints without an override.
    pub fn with_default_config(mut self, config: BreakerConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Sets the time source shared by every breaker in the registry.
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Sets a shared time source.
    pub fn with_arc_clock(mut self, clock: ArcClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::core::ConfigError) if the default
    /// configuration fails [`BreakerConfig::validate`].
    pub fn build(self) -> ConfigResult<BreakerRegistry> {
        self.default_config.validate()?;

        Ok(BreakerRegistry {
            default_config: self.default_config,
            clock: self
                .clock
                .unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            breakers: RwLock::new(HashMap::new()),
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A keyed collection of breakers, one per endpoint.
///
/// Breakers are created on first use and live until removed. The registry
/// lock covers only map lookups and mutation; calls run against the resolved
/// breaker after the lock is released, so a slow endpoint never blocks
/// another.
///
/// The registry is an ordinary value: construct it where the application is
/// wired together and pass it (typically in an `Arc`) to whatever issues
/// calls.
///
/// # Example
///
/// ```rust
/// use faultgate::registry::BreakerRegistry;
///
/// # async fn run() {
/// let registry = BreakerRegistry::new();
///
/// let body = registry
///     .execute("profile-service", || async { Ok::<_, std::io::Error>("{}") })
///     .await;
///
/// assert!(body.is_ok());
/// assert!(registry.health_summary().all_healthy());
/// # }
/// ```
pub struct BreakerRegistry {
    /// Configuration for endpoints without an override.
    default_config: BreakerConfig,
    /// Time source handed to every breaker.
    clock: ArcClock,
    /// Breakers keyed by endpoint id.
    breakers: RwLock<HashMap<String, Arc<Breaker>>>,
}

impl BreakerRegistry {
    /// Creates a registry with default configuration and a system clock.
    pub fn new() -> Self {
        Self {
            default_config: BreakerConfig::default(),
            clock: Arc::new(MonotonicClock::new()),
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a new builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the configuration used for endpoints without an override.
    pub fn default_config(&self) -> &BreakerConfig {
        &self.default_config
    }

    /// Returns the breaker for `endpoint`, creating it if needed.
    ///
    /// A new breaker gets the default configuration with `config_override`
    /// merged on top. The override is only consulted at creation: once a
    /// breaker exists, later overrides are ignored and the same instance is
    /// returned.
    pub fn get_or_create(
        &self,
        endpoint: &str,
        config_override: Option<&BreakerConfigOverride>,
    ) -> Arc<Breaker> {
        if let Some(breaker) = self.get(endpoint) {
            return breaker;
        }

        let mut breakers = self
            .breakers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Another caller may have created it between the two locks.
        let breaker = breakers.entry(endpoint.to_string()).or_insert_with(|| {
            let config = config_override
                .map(|over| over.merge_onto(&self.default_config))
                .unwrap_or(self.default_config);

            tracing::debug!(
                endpoint = %endpoint,
                failure_threshold = config.failure_threshold,
                recovery_timeout_ms = config.recovery_timeout.as_millis() as u64,
                success_threshold = config.success_threshold,
                half_open_max_calls = config.half_open_max_calls,
                "Created circuit breaker"
            );

            Arc::new(Breaker::with_clock(endpoint, config, Arc::clone(&self.clock)))
        });

        Arc::clone(breaker)
    }

    /// Returns the breaker for `endpoint` if one exists.
    pub fn get(&self, endpoint: &str) -> Option<Arc<Breaker>> {
        self.breakers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(endpoint)
            .cloned()
    }

    /// Returns `true` if a breaker exists for `endpoint`.
    pub fn contains(&self, endpoint: &str) -> bool {
        self.breakers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(endpoint)
    }

    /// Returns the number of tracked endpoints.
    pub fn len(&self) -> usize {
        self.breakers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns `true` if no endpoint is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the tracked endpoint ids, sorted.
    pub fn endpoints(&self) -> Vec<String> {
        let mut endpoints: Vec<String> = self
            .breakers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        endpoints.sort();
        endpoints
    }

    /// Runs `operation` through the breaker for `endpoint`.
    ///
    /// # Errors
    ///
    /// See [`Breaker::execute`].
    pub async fn execute<F, Fut, T, E>(&self, endpoint: &str, operation: F) -> CallResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let breaker = self.get_or_create(endpoint, None);
        breaker.execute(operation).await
    }

    /// Runs `operation` through the breaker for `endpoint`, creating that
    /// breaker with `config_override` if it does not exist yet.
    ///
    /// # Errors
    ///
    /// See [`Breaker::execute`].
    pub async fn execute_with_override<F, Fut, T, E>(
        &self,
        endpoint: &str,
        config_override: &BreakerConfigOverride,
        operation: F,
    ) -> CallResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let breaker = self.get_or_create(endpoint, Some(config_override));
        breaker.execute(operation).await
    }

    /// Runs a synchronous `operation` through the breaker for `endpoint`.
    ///
    /// # Errors
    ///
    /// See [`Breaker::execute_blocking`].
    pub fn execute_blocking<F, T, E>(&self, endpoint: &str, operation: F) -> CallResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.get_or_create(endpoint, None).execute_blocking(operation)
    }

    fn snapshot(&self) -> Vec<Arc<Breaker>> {
        self.breakers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Returns a snapshot of every tracked breaker, keyed by endpoint id.
    pub fn stats_for_all(&self) -> BTreeMap<String, BreakerStats> {
        self.snapshot()
            .into_iter()
            .map(|breaker| (breaker.endpoint().to_string(), breaker.stats()))
            .collect()
    }

    /// Resets every tracked breaker.
    pub fn reset_all(&self) {
        for breaker in self.snapshot() {
            breaker.reset();
        }
    }

    /// Stops tracking `endpoint`. Returns whether it was tracked.
    ///
    /// Calls already admitted by the removed breaker finish against it; the
    /// next call for `endpoint` gets a fresh breaker.
    pub fn remove(&self, endpoint: &str) -> bool {
        let removed = self
            .breakers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(endpoint)
            .is_some();

        if removed {
            tracing::debug!(endpoint = %endpoint, "Removed circuit breaker");
        }
        removed
    }

    /// Summarizes the health of every tracked endpoint.
    pub fn health_summary(&self) -> HealthSummary {
        HealthSummary::from_stats(&self.stats_for_all())
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BreakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("default_config", &self.default_config)
            .field("clock", &self.clock)
            .field("endpoints", &self.endpoints())
            .finish()
    }
}
