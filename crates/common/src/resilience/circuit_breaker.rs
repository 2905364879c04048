//! Circuit breaker with bounded retry
//!
//! A breaker isolates one category of unreliable operation. While `Closed`,
//! calls run through the bounded retry loop from [`super::retry`]. When a
//! call exhausts its retry budget (or its elapsed budget) the breaker opens
//! and rejects every call without invoking the operation until
//! `open_timeout` has passed since the last failure. The first call after
//! that moves the breaker to `HalfOpen`; `success_threshold` successful
//! calls close it again and any failure reopens it.
//!
//! ## Concurrency
//!
//! State lives behind a `parking_lot::Mutex` that guards admission and
//! transitions only; it is never held across an `.await`, so guarded
//! operations run concurrently. Each admitted call remembers the state
//! generation it was admitted under. When the call finishes after the
//! breaker has already moved on (another call opened or closed it), the
//! stale outcome is counted in metrics but drives no transition. This is
//! what makes a burst of concurrent failures open the breaker exactly once.
//!
//! Concurrent calls admitted in `HalfOpen` are not limited: each success
//! counts toward `success_threshold` and the first failure reopens.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use homevoice_common::resilience::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CircuitBreakerConfig::builder()
//!     .open_timeout(Duration::from_secs(30))
//!     .success_threshold(3)
//!     .max_retries(3)
//!     .build()?;
//! let breaker = CircuitBreaker::new("publish", config)?;
//!
//! let value = breaker.execute(|| async { Ok::<_, std::io::Error>(7) }).await?;
//! assert_eq!(value, 7);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, instrument};

use super::clock::{Clock, SystemClock};
use super::error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
use super::observer::{BreakerObserver, NoOpObserver, OperationStatus};
use super::retry::policies::RetryTransient;
use super::retry::{RetryConfig, RetryError, RetryExecutor, RetryPolicy};
use crate::error::ErrorClassification;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
    /// Circuit is half-open, probing whether the dependency recovered
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used by the state gauge (0 closed, 1 open, 2
    /// half-open)
    pub fn as_metric_value(&self) -> i64 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }

    /// Lowercase label used in metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Time since the last failure before an open breaker admits a probe
    pub open_timeout: Duration,
    /// Successful half-open calls needed to close the breaker
    pub success_threshold: u32,
    /// Bounded retry applied to every admitted call
    pub retry: RetryConfig,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(30),
            success_threshold: 3,
            retry: RetryConfig::default(),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.success_threshold == 0 {
            return Err(ConfigError::invalid("success_threshold must be greater than 0"));
        }

        if self.open_timeout.is_zero() {
            return Err(ConfigError::invalid("open_timeout must be greater than 0"));
        }

        self.retry.validate()
    }
}

/// Builder for CircuitBreakerConfig
#[derive(Debug)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    /// Builder starting from the default configuration
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    /// Time an open breaker waits after the last failure before probing
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.config.open_timeout = timeout;
        self
    }

    /// Half-open successes needed to close the breaker
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    /// Retries after the first attempt
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Elapsed budget for one call, retries included
    pub fn max_elapsed(mut self, budget: Duration) -> Self {
        self.config.retry.max_elapsed = budget;
        self
    }

    /// Doubling backoff between `initial` and `max`
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.retry.backoff = super::retry::BackoffStrategy::doubling(initial, max);
        self
    }

    /// Replace the whole retry configuration
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time view of a breaker's state and counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerMetrics {
    pub name: String,
    pub state: CircuitState,
    /// Calls made through the breaker, rejected ones included
    pub total_calls: u64,
    pub successes: u64,
    pub failures: u64,
    pub rejections: u64,
    pub consecutive_half_open_successes: u32,
    pub last_failure_time: Option<Instant>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    last_failure_time: Option<Instant>,
    consecutive_half_open_successes: u32,
    /// Start of the current outage, kept across half-open reopenings
    opened_at: Option<Instant>,
    /// Bumped on every transition
    generation: u64,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            last_failure_time: None,
            consecutive_half_open_successes: 0,
            opened_at: None,
            generation: 0,
        }
    }

    fn transition(&mut self, to: CircuitState) -> Transition {
        let from = self.state;
        self.state = to;
        self.generation += 1;
        Transition { from, to, recovered_after: None }
    }
}

/// Snapshot taken when a call is admitted
#[derive(Debug, Clone, Copy)]
struct Ticket {
    generation: u64,
}

/// A state change to report once the lock is released
#[derive(Debug, Clone, Copy)]
struct Transition {
    from: CircuitState,
    to: CircuitState,
    recovered_after: Option<Duration>,
}

/// Named circuit breaker guarding one category of operation
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    observer: Arc<dyn BreakerObserver>,
    clock: Arc<dyn Clock>,
    total_calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .field("total_calls", &self.total_calls.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a breaker on the system clock with no observer
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(name, config, SystemClock)
    }

    /// Create a breaker with a custom clock (useful for testing)
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: impl Clock,
    ) -> ConfigResult<Self> {
        Self::with_shared_clock(name, config, Arc::new(clock))
    }

    pub(crate) fn with_shared_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState::new()),
            observer: Arc::new(NoOpObserver),
            clock,
            total_calls: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        })
    }

    /// Attach an observer for state changes and call outcomes
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BreakerObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state as last recorded
    ///
    /// An open breaker whose timeout has expired still reports `Open` until
    /// the next call moves it to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Snapshot of state and counters
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let (state, consecutive_half_open_successes, last_failure_time) = {
            let inner = self.inner.lock();
            (inner.state, inner.consecutive_half_open_successes, inner.last_failure_time)
        };

        CircuitBreakerMetrics {
            name: self.name.clone(),
            state,
            total_calls: self.total_calls.load(Ordering::Acquire),
            successes: self.successes.load(Ordering::Acquire),
            failures: self.failures.load(Ordering::Acquire),
            rejections: self.rejections.load(Ordering::Acquire),
            consecutive_half_open_successes,
            last_failure_time,
        }
    }

    /// Execute an operation, retrying errors classified as transient
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + ErrorClassification + Send + Sync + 'static,
    {
        self.execute_with_policy("execute", RetryTransient, operation).await
    }

    /// Like [`Self::execute`], labelling the outcome with `operation_type`
    pub async fn execute_as<F, Fut, T, E>(
        &self,
        operation_type: &str,
        operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + ErrorClassification + Send + Sync + 'static,
    {
        self.execute_with_policy(operation_type, RetryTransient, operation).await
    }

    /// Execute an operation under a caller-supplied retry policy
    ///
    /// Outcomes:
    /// - success: `Ok`, and a half-open breaker counts toward closing
    /// - retry budget or attempt cap exhausted: `RetriesExhausted`, breaker
    ///   opens
    /// - elapsed budget ran out mid-attempt: `Timeout`, breaker opens
    /// - policy declined to retry: `NonRetryable`, breaker state unchanged
    /// - breaker open: `CircuitOpen`, operation not invoked
    #[instrument(skip(self, policy, operation), fields(breaker = %self.name))]
    pub async fn execute_with_policy<F, Fut, T, E, P>(
        &self,
        operation_type: &str,
        policy: P,
        operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
        P: RetryPolicy<E>,
    {
        // Relaxed OK: independent counter
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let Some(ticket) = self.admit() else {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            debug!(breaker = %self.name, operation_type, "circuit open, rejecting call");
            self.observer.on_operation_result(
                &self.name,
                operation_type,
                OperationStatus::Rejected,
            );
            return Err(ResilienceError::CircuitOpen { breaker: self.name.clone() });
        };

        let executor = RetryExecutor::new(self.config.retry.clone(), policy);
        let result = executor.execute(operation).await;

        let (status, outcome) = match result {
            Ok(value) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                self.record_success(ticket);
                (OperationStatus::Success, Ok(value))
            }
            Err(RetryError::NonRetryable { source, .. }) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                (
                    OperationStatus::Failure,
                    Err(ResilienceError::NonRetryable { breaker: self.name.clone(), source }),
                )
            }
            Err(RetryError::Exhausted { attempts, source, .. }) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.record_failure(ticket);
                (
                    OperationStatus::Failure,
                    Err(ResilienceError::RetriesExhausted {
                        breaker: self.name.clone(),
                        attempts,
                        source,
                    }),
                )
            }
            Err(RetryError::TimedOut { attempts, elapsed, .. }) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.record_failure(ticket);
                (
                    OperationStatus::Failure,
                    Err(ResilienceError::Timeout { breaker: self.name.clone(), attempts, elapsed }),
                )
            }
        };

        self.observer.on_operation_result(&self.name, operation_type, status);
        outcome
    }

    /// Force the breaker closed and clear half-open progress
    ///
    /// In-flight calls admitted before the reset drive no transition when
    /// they finish.
    pub fn reset(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            let transition = inner.transition(CircuitState::Closed);
            inner.last_failure_time = None;
            inner.consecutive_half_open_successes = 0;
            inner.opened_at = None;
            transition
        };

        if transition.from != CircuitState::Closed {
            self.notify(transition);
        }
    }

    /// Force the breaker open as if a call had just failed
    pub fn force_open(&self) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.inner.lock();
            let transition = inner.transition(CircuitState::Open);
            inner.last_failure_time = Some(now);
            inner.consecutive_half_open_successes = 0;
            inner.opened_at.get_or_insert(now);
            transition
        };

        if transition.from != CircuitState::Open {
            self.notify(transition);
        }
    }

    /// Admission check; moves `Open` to `HalfOpen` once the timeout expired
    fn admit(&self) -> Option<Ticket> {
        let now = self.clock.now();
        let (ticket, transition) = {
            let mut inner = self.inner.lock();
            match inner.state {
                CircuitState::Closed | CircuitState::HalfOpen => {
                    (Some(Ticket { generation: inner.generation }), None)
                }
                CircuitState::Open => {
                    let expired = inner.last_failure_time.map_or(true, |failed_at| {
                        now.saturating_duration_since(failed_at) >= self.config.open_timeout
                    });
                    if expired {
                        inner.consecutive_half_open_successes = 0;
                        let transition = inner.transition(CircuitState::HalfOpen);
                        (Some(Ticket { generation: inner.generation }), Some(transition))
                    } else {
                        (None, None)
                    }
                }
            }
        };

        if let Some(transition) = transition {
            self.notify(transition);
        }
        ticket
    }

    fn record_success(&self, ticket: Ticket) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.inner.lock();
            if inner.generation != ticket.generation {
                debug!(breaker = %self.name, "ignoring stale success");
                return;
            }

            match inner.state {
                CircuitState::HalfOpen => {
                    inner.consecutive_half_open_successes += 1;
                    if inner.consecutive_half_open_successes >= self.config.success_threshold {
                        inner.consecutive_half_open_successes = 0;
                        inner.last_failure_time = None;
                        let recovered_after = inner
                            .opened_at
                            .take()
                            .map(|opened| now.saturating_duration_since(opened));
                        let mut transition = inner.transition(CircuitState::Closed);
                        transition.recovered_after = recovered_after;
                        Some(transition)
                    } else {
                        None
                    }
                }
                CircuitState::Closed | CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    fn record_failure(&self, ticket: Ticket) {
        let now = self.clock.now();
        let transition = {
            let mut inner = self.inner.lock();
            if inner.generation != ticket.generation {
                debug!(breaker = %self.name, "ignoring stale failure");
                return;
            }

            match inner.state {
                CircuitState::Closed | CircuitState::HalfOpen => {
                    inner.last_failure_time = Some(now);
                    inner.consecutive_half_open_successes = 0;
                    inner.opened_at.get_or_insert(now);
                    Some(inner.transition(CircuitState::Open))
                }
                CircuitState::Open => None,
            }
        };

        if let Some(transition) = transition {
            self.notify(transition);
        }
    }

    fn notify(&self, transition: Transition) {
        self.observer.on_state_change(&self.name, transition.from, transition.to);
        if let Some(duration) = transition.recovered_after {
            self.observer.on_recovery(&self.name, duration);
        }
    }
}
