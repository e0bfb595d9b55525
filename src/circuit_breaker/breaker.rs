//! Circuit breaker implementation.

use crate::circuit_breaker::config::BreakerConfig;
use crate::circuit_breaker::state::{availability, BreakerStats, CircuitState, Phase};
use crate::core::{
    ArcClock, BlockReason, BlockedCall, CallError, CallResult, Clock, ConfigResult,
    MonotonicClock,
};
use crate::events::{self, TransitionCause, TransitionEvent};

use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// A circuit breaker guarding one endpoint.
///
/// The breaker decides whether a call may run, runs it if admitted, observes
/// the outcome and updates its own state. It never retries, times out or
/// alters the operation's result.
///
/// # States
///
/// - **Closed**: Normal operation. Calls pass through, failures are counted.
/// - **Open**: Dependency presumed down. Calls are rejected immediately until
///   the recovery timeout, measured from the last failure, has elapsed.
/// - **Half-Open**: Probation. Up to `half_open_max_calls` probes are let
///   through; one failure reopens the circuit, `success_threshold`
///   successes close it.
///
/// The move from open to half-open is evaluated lazily, on the next admission
/// check. No background timer runs.
///
/// # Example
///
/// ```rust
/// use faultgate::circuit_breaker::{Breaker, BreakerConfig};
///
/// # async fn run() {
/// let breaker = Breaker::new("payments", BreakerConfig::default());
///
/// let result = breaker
///     .execute(|| async { Ok::<_, std::io::Error>("charged") })
///     .await;
///
/// assert_eq!(result.ok(), Some("charged"));
/// # }
/// ```
pub struct Breaker {
    /// Endpoint this breaker guards.
    endpoint: String,
    /// Identity of this instance.
    instance_id: Uuid,
    /// Configuration.
    config: BreakerConfig,
    /// Time source.
    clock: ArcClock,
    /// State, counters and timestamps, updated as one unit.
    core: Mutex<Core>,
}

#[derive(Debug)]
struct Core {
    phase: Phase,
    failure_count: u32,
    success_count: u32,
    total_calls: u64,
    total_failures: u64,
    rejected_calls: u64,
    last_failure_at: Option<Duration>,
    last_success_at: Option<Duration>,
    state_change_count: u64,
    created_at: Duration,
    last_transition: Option<TransitionEvent>,
    /// Bumped on every transition and reset; identifies a half-open episode.
    /// Unlike `state_change_count` it is never zeroed.
    epoch: u64,
}

impl Core {
    fn new(now: Duration, epoch: u64) -> Self {
        Self {
            phase: Phase::Closed,
            failure_count: 0,
            success_count: 0,
            total_calls: 0,
            total_failures: 0,
            rejected_calls: 0,
            last_failure_at: None,
            last_success_at: None,
            state_change_count: 0,
            created_at: now,
            last_transition: None,
            epoch,
        }
    }

    /// Time since the last failure; `None` if no failure was ever recorded.
    fn since_last_failure(&self, now: Duration) -> Option<Duration> {
        self.last_failure_at.map(|at| now.saturating_sub(at))
    }

    fn transition(&mut self, endpoint: &str, to: CircuitState, cause: TransitionCause) {
        let from = self.phase.state();
        self.phase = Phase::entering(to);
        self.success_count = 0;
        if to.is_closed() {
            self.failure_count = 0;
        }
        self.state_change_count += 1;
        self.epoch += 1;

        let event = TransitionEvent {
            endpoint: endpoint.to_string(),
            from,
            to,
            cause,
            failure_count: self.failure_count,
            state_change_count: self.state_change_count,
            timestamp: Utc::now(),
        };
        events::emit_state_transition(&event);
        self.last_transition = Some(event);
    }

    fn admit(
        &mut self,
        endpoint: &str,
        config: &BreakerConfig,
        now: Duration,
    ) -> Result<Option<u64>, BlockReason> {
        let probe_epoch = match self.phase {
            Phase::Closed => None,

            Phase::Open => match self.since_last_failure(now) {
                Some(elapsed) if elapsed < config.recovery_timeout => {
                    return Err(BlockReason::RecoveryPending {
                        retry_in: config.recovery_timeout - elapsed,
                    });
                }
                _ => {
                    self.transition(
                        endpoint,
                        CircuitState::HalfOpen,
                        TransitionCause::RecoveryTimeoutElapsed,
                    );
                    // This call is the first probe of the episode.
                    self.phase = Phase::HalfOpen { admitted: 1 };
                    Some(self.epoch)
                }
            },

            Phase::HalfOpen { admitted } => {
                if admitted >= config.half_open_max_calls {
                    return Err(BlockReason::ProbeQuotaExhausted {
                        max_probes: config.half_open_max_calls,
                    });
                }
                self.phase = Phase::HalfOpen {
                    admitted: admitted + 1,
                };
                Some(self.epoch)
            }
        };

        self.total_calls += 1;
        Ok(probe_epoch)
    }

    fn record_success(&mut self, endpoint: &str, config: &BreakerConfig, now: Duration) {
        self.last_success_at = Some(now);
        self.success_count = self.success_count.saturating_add(1);

        match self.phase {
            Phase::HalfOpen { .. } => {
                if self.success_count >= config.success_threshold {
                    self.transition(
                        endpoint,
                        CircuitState::Closed,
                        TransitionCause::ProbesSucceeded,
                    );
                }
            }

            Phase::Closed => {
                // Failures older than the monitoring period no longer count.
                let stale = self
                    .since_last_failure(now)
                    .map_or(true, |elapsed| elapsed > config.monitoring_period);
                if stale {
                    self.failure_count = 0;
                }
            }

            Phase::Open => {}
        }
    }

    fn record_failure(&mut self, endpoint: &str, config: &BreakerConfig, now: Duration) {
        self.count_failure(now);

        match self.phase {
            Phase::HalfOpen { .. } => {
                self.transition(endpoint, CircuitState::Open, TransitionCause::ProbeFailed);
            }

            Phase::Closed => {
                if self.failure_count >= config.failure_threshold {
                    self.transition(
                        endpoint,
                        CircuitState::Open,
                        TransitionCause::FailureThreshold,
                    );
                }
            }

            Phase::Open => {}
        }
    }

    fn count_failure(&mut self, now: Duration) {
        self.last_failure_at = Some(now);
        self.failure_count = self.failure_count.saturating_add(1);
        self.total_failures += 1;
    }

    /// Fails half-open episode `epoch` on behalf of a probe that never
    /// reported back. No-op once that episode has ended.
    fn abandon_probe(&mut self, endpoint: &str, now: Duration, epoch: u64) {
        if self.epoch != epoch || !self.phase.state().is_half_open() {
            return;
        }
        self.count_failure(now);
        self.transition(endpoint, CircuitState::Open, TransitionCause::ProbeAbandoned);
    }
}

impl Breaker {
    /// Creates a breaker for `endpoint` using a monotonic system clock.
    pub fn new(endpoint: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_clock(endpoint, config, Arc::new(MonotonicClock::new()))
    }

    /// Creates a breaker with default configuration.
    pub fn with_defaults(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, BreakerConfig::default())
    }

    /// Creates a breaker reading time from `clock`.
    ///
    /// A configuration rejected by [`BreakerConfig::validate`] is still used,
    /// with a warning; see [`Breaker::try_with_clock`] for the strict variant.
    pub fn with_clock(endpoint: impl Into<String>, config: BreakerConfig, clock: ArcClock) -> Self {
        let endpoint = endpoint.into();
        if let Err(e) = config.validate() {
            tracing::warn!(
                endpoint = %endpoint,
                error = %e,
                "Creating circuit breaker with questionable configuration"
            );
        }
        Self::build(endpoint, config, clock)
    }

    /// Creates a breaker reading time from `clock`, rejecting a configuration
    /// that fails [`BreakerConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](crate::core::ConfigError) for a zero-valued
    /// field or a success threshold above the half-open call limit.
    pub fn try_with_clock(
        endpoint: impl Into<String>,
        config: BreakerConfig,
        clock: ArcClock,
    ) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(endpoint.into(), config, clock))
    }

    /// Creates a breaker using a monotonic system clock, rejecting an invalid
    /// configuration.
    ///
    /// # Errors
    ///
    /// Same as [`Breaker::try_with_clock`].
    pub fn try_new(endpoint: impl Into<String>, config: BreakerConfig) -> ConfigResult<Self> {
        Self::try_with_clock(endpoint, config, Arc::new(MonotonicClock::new()))
    }

    fn build(endpoint: String, config: BreakerConfig, clock: ArcClock) -> Self {
        let now = clock.now();
        Self {
            endpoint,
            instance_id: Uuid::new_v4(),
            config,
            clock,
            core: Mutex::new(Core::new(now, 0)),
        }
    }

    /// Returns the endpoint this breaker guards.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the identity of this breaker instance.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Returns the current state as last stored.
    ///
    /// Does not evaluate the recovery timeout: an open breaker stays `Open`
    /// here until a call attempt moves it to half-open.
    pub fn state(&self) -> CircuitState {
        self.lock().phase.state()
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs the admission check and, if admitted, reserves the call.
    ///
    /// The returned permit must be settled with [`CallPermit::record_success`]
    /// or [`CallPermit::record_failure`] once the guarded call finishes.
    /// Dropping it unsettled records nothing for a closed-state call. An
    /// unsettled half-open probe keeps its slot and reopens the circuit, as
    /// if the probe had failed.
    ///
    /// # Errors
    ///
    /// Returns [`BlockedCall`] when the breaker is open and the recovery
    /// timeout has not elapsed, or when every half-open probe slot is taken.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, BlockedCall> {
        let now = self.clock.now();
        let mut core = self.lock();

        match core.admit(&self.endpoint, &self.config, now) {
            Ok(probe_epoch) => Ok(CallPermit {
                breaker: self,
                probe_epoch,
                settled: false,
            }),
            Err(reason) => {
                core.rejected_calls += 1;
                let blocked = BlockedCall {
                    endpoint: self.endpoint.clone(),
                    state: core.phase.state(),
                    reason,
                };
                drop(core);
                events::emit_call_rejected(&blocked);
                Err(blocked)
            }
        }
    }

    /// Runs `operation` under the protection of this breaker.
    ///
    /// The breaker's lock is held only for the admission check and for
    /// recording the outcome, never while the operation runs.
    ///
    /// Dropping the returned future mid-call, for example on a caller-side
    /// timeout, abandons the call. An abandoned half-open probe reopens the
    /// circuit.
    ///
    /// # Errors
    ///
    /// - [`CallError::Blocked`](crate::core::CallError::Blocked) if admission
    ///   was denied. `operation` is not invoked.
    /// - [`CallError::Operation`](crate::core::CallError::Operation) holding
    ///   the operation's own error, unchanged.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> CallResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire()?;

        match operation().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(err) => {
                permit.record_failure();
                Err(CallError::Operation(err))
            }
        }
    }

    /// Runs a synchronous `operation` under the protection of this breaker.
    ///
    /// Same contract as [`Breaker::execute`]. A panicking operation records
    /// nothing while closed and fails the episode while half-open.
    pub fn execute_blocking<F, T, E>(&self, operation: F) -> CallResult<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let permit = self.try_acquire()?;

        match operation() {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(err) => {
                permit.record_failure();
                Err(CallError::Operation(err))
            }
        }
    }

    /// Returns a point-in-time snapshot of this breaker.
    pub fn stats(&self) -> BreakerStats {
        let now = self.clock.now();
        let core = self.lock();

        BreakerStats {
            endpoint: self.endpoint.clone(),
            instance_id: self.instance_id,
            state: core.phase.state(),
            failure_count: core.failure_count,
            success_count: core.success_count,
            total_calls: core.total_calls,
            total_failures: core.total_failures,
            rejected_calls: core.rejected_calls,
            half_open_admitted: core.phase.half_open_admitted(),
            last_failure_at: core.last_failure_at,
            last_success_at: core.last_success_at,
            state_change_count: core.state_change_count,
            uptime: now.saturating_sub(core.created_at),
            availability: availability(core.total_calls, core.total_failures),
            last_transition: core.last_transition.clone(),
        }
    }

    /// Restores the breaker to its initial condition.
    ///
    /// State becomes `Closed`; every counter and timestamp is cleared and
    /// uptime restarts. Calls admitted before the reset still settle, against
    /// the fresh counters.
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut core = self.lock();
        let previous = core.phase.state();
        let epoch = core.epoch + 1;
        *core = Core::new(now, epoch);
        drop(core);

        events::emit_breaker_reset(&self.endpoint, previous);
    }

    /// Sets the state unconditionally, bypassing every transition guard.
    ///
    /// Counts as a transition but leaves the counters alone. Intended for
    /// tests and operator overrides.
    pub fn force_state(&self, state: CircuitState) {
        let mut core = self.lock();
        let from = core.phase.state();
        core.phase = Phase::entering(state);
        core.state_change_count += 1;
        core.epoch += 1;

        let event = TransitionEvent {
            endpoint: self.endpoint.clone(),
            from,
            to: state,
            cause: TransitionCause::Forced,
            failure_count: core.failure_count,
            state_change_count: core.state_change_count,
            timestamp: Utc::now(),
        };
        events::emit_state_transition(&event);
        core.last_transition = Some(event);
    }

    fn settle(&self, succeeded: bool) {
        let now = self.clock.now();
        let mut core = self.lock();
        if succeeded {
            core.record_success(&self.endpoint, &self.config, now);
        } else {
            core.record_failure(&self.endpoint, &self.config, now);
        }
    }
}

impl fmt::Debug for Breaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Breaker")
            .field("endpoint", &self.endpoint)
            .field("instance_id", &self.instance_id)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// An admitted call that has not reported its outcome yet.
///
/// Obtained from [`Breaker::try_acquire`] for callers that cannot hand the
/// breaker a closure or future.
#[must_use = "a permit should be settled with record_success or record_failure"]
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a Breaker,
    /// Set when the call was admitted as a half-open probe.
    probe_epoch: Option<u64>,
    settled: bool,
}

impl CallPermit<'_> {
    /// Returns `true` if this call was admitted as a half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe_epoch.is_some()
    }

    /// Records that the guarded call succeeded.
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.settle(true);
    }

    /// Records that the guarded call failed.
    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.settle(false);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(epoch) = self.probe_epoch {
            let now = self.breaker.clock.now();
            self.breaker
                .lock()
                .abandon_probe(&self.breaker.endpoint, now, epoch);
        }
    }
}
