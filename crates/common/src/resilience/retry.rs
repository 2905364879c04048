//! Bounded retry with exponential backoff
//!
//! A call is bounded twice: by an attempt cap (`max_retries` retries after the
//! first attempt) and by a total elapsed budget (`max_elapsed`). Whichever is
//! reached first ends the loop. An attempt still running when the budget
//! runs out is cancelled.
//!
//! Only errors the [`RetryPolicy`] accepts are retried. Anything else is
//! returned on first occurrence without consuming retry budget.

use std::fmt;
use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::{ConfigError, ConfigResult};

/// Terminal outcome of a failed retry loop
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The attempt cap or elapsed budget was reached
    #[error("retries exhausted after {attempts} attempts in {elapsed:?}")]
    Exhausted { attempts: u32, elapsed: Duration, source: E },

    /// The policy refused to retry this error
    #[error("operation failed with non-retryable error")]
    NonRetryable { attempts: u32, source: E },

    /// An attempt was cancelled because the elapsed budget ran out
    #[error("retry budget of {budget:?} exceeded after {attempts} attempts")]
    TimedOut { attempts: u32, elapsed: Duration, budget: Duration },
}

impl<E> RetryError<E> {
    /// Number of times the operation was invoked
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::NonRetryable { attempts, .. }
            | Self::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution including result and summary statistics
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
    pub total_delay: Duration,
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }
}

/// Trait for determining whether an error should be retried
pub trait RetryPolicy<E> {
    /// Determine if the error should be retried and optionally provide a custom
    /// delay
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation with the default backoff delay
    Retry,
    /// Retry the operation with a custom delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Exponential backoff: `initial_delay * base^attempt`, capped at
    /// `max_delay`
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Doubling backoff starting at `initial_delay`, capped at `max_delay`
    pub fn doubling(initial_delay: Duration, max_delay: Duration) -> Self {
        Self::Exponential { initial_delay, base: 2.0, max_delay }
    }

    /// Calculate the delay before retry number `attempt + 1`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = initial_delay.as_millis() as f64 * base.powi(exponent);
                let delay_ms = delay.min(max_delay.as_millis() as f64) as u64;
                Duration::from_millis(delay_ms)
            }
        }
    }
}

/// Jitter type for adding randomness to retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter
    None,
    /// Full jitter: 0 to calculated_delay
    Full,
    /// Equal jitter: calculated_delay/2 to calculated_delay
    Equal,
}

impl Jitter {
    /// Apply jitter to the calculated delay
    pub fn apply(&self, delay: Duration) -> Duration {
        let millis = delay.as_millis() as u64;
        match self {
            Self::None => delay,
            Self::Full => Duration::from_millis(random_below(millis + 1)),
            Self::Equal => {
                let half = millis / 2;
                Duration::from_millis(half + random_below(millis - half + 1))
            }
        }
    }
}

/// Pseudo-random value in `0..max` seeded from the wall clock
fn random_below(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }

    let nanos =
        u64::from(SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().subsec_nanos());

    // Linear congruential step (Numerical Recipes constants)
    let mut seed = nanos.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
    seed % max
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (`3` means at most 4 invocations)
    pub max_retries: u32,
    /// Total time budget for one call, attempts and backoff included
    pub max_elapsed: Duration,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
    /// Jitter type for randomizing delays
    pub jitter: Jitter,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_elapsed: Duration::from_secs(2),
            backoff: BackoffStrategy::doubling(Duration::from_millis(100), Duration::from_secs(1)),
            jitter: Jitter::None,
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_elapsed.is_zero() {
            return Err(ConfigError::invalid("max_elapsed must be greater than 0"));
        }

        if let BackoffStrategy::Exponential { base, initial_delay, max_delay } = &self.backoff {
            if *base <= 0.0 {
                return Err(ConfigError::invalid("exponential base must be greater than 0"));
            }
            if initial_delay > max_delay {
                return Err(ConfigError::invalid("initial backoff must not exceed max backoff"));
            }
        }

        Ok(())
    }

    /// Upper bound on operation invocations for one call
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Builder starting from the default retry configuration
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    /// Retries after the first attempt
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Elapsed budget across all attempts
    pub fn max_elapsed(mut self, budget: Duration) -> Self {
        self.config.max_elapsed = budget;
        self
    }

    /// Wait `delay` between every attempt
    pub fn fixed_backoff(mut self, delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::Fixed(delay);
        self
    }

    /// Doubling backoff between `initial_delay` and `max_delay`
    pub fn exponential_backoff(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.config.backoff = BackoffStrategy::doubling(initial_delay, max_delay);
        self
    }

    /// Use computed delays as they are
    pub fn no_jitter(mut self) -> Self {
        self.config.jitter = Jitter::None;
        self
    }

    /// Randomize each delay between zero and the computed delay
    pub fn full_jitter(mut self) -> Self {
        self.config.jitter = Jitter::Full;
        self
    }

    /// Randomize each delay between half and all of the computed delay
    pub fn equal_jitter(mut self) -> Self {
        self.config.jitter = Jitter::Equal;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> ConfigResult<RetryConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Configuration this executor runs with
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let deadline = started + self.config.max_elapsed;
        let mut attempt: u32 = 0;
        let mut total_delay = Duration::ZERO;

        loop {
            let attempts = attempt.saturating_add(1);
            debug!(
                attempt = attempts,
                max_attempts = self.config.max_attempts(),
                "executing operation"
            );

            let error = match tokio::time::timeout_at(deadline, operation()).await {
                Ok(Ok(value)) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "operation succeeded after retries");
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                        total_delay,
                        elapsed: started.elapsed(),
                    };
                }
                Ok(Err(error)) => error,
                Err(_) => {
                    let elapsed = started.elapsed();
                    warn!(attempts, ?elapsed, "attempt cancelled, retry budget exceeded");
                    return RetryOutcome {
                        result: Err(RetryError::TimedOut {
                            attempts,
                            elapsed,
                            budget: self.config.max_elapsed,
                        }),
                        attempts,
                        total_delay,
                        elapsed,
                    };
                }
            };

            let delay = match self.policy.should_retry(&error, attempt) {
                RetryDecision::Stop => {
                    debug!(?error, "retry policy declined to retry");
                    return RetryOutcome {
                        result: Err(RetryError::NonRetryable { attempts, source: error }),
                        attempts,
                        total_delay,
                        elapsed: started.elapsed(),
                    };
                }
                RetryDecision::Retry => {
                    self.config.jitter.apply(self.config.backoff.calculate_delay(attempt))
                }
                RetryDecision::RetryAfter(delay) => delay,
            };

            let out_of_attempts = attempt >= self.config.max_retries;
            let out_of_time = Instant::now() + delay >= deadline;
            if out_of_attempts || out_of_time {
                let elapsed = started.elapsed();
                warn!(attempts, ?elapsed, ?error, "retry attempts exhausted");
                return RetryOutcome {
                    result: Err(RetryError::Exhausted { attempts, elapsed, source: error }),
                    attempts,
                    total_delay,
                    elapsed,
                };
            }

            debug!(attempt = attempts, ?delay, ?error, "operation failed, backing off");
            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::{RetryDecision, RetryPolicy};
    use crate::error::ErrorClassification;

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Retry
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> RetryDecision {
            RetryDecision::Stop
        }
    }

    /// Retries errors whose classification reports them as transient
    ///
    /// Honors [`ErrorClassification::retry_after`] when the error carries a
    /// suggested delay.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RetryTransient;

    impl<E: ErrorClassification> RetryPolicy<E> for RetryTransient {
        fn should_retry(&self, error: &E, _attempt: u32) -> RetryDecision {
            if !error.is_retryable() {
                return RetryDecision::Stop;
            }
            error.retry_after().map_or(RetryDecision::Retry, RetryDecision::RetryAfter)
        }
    }

    /// Predicate-based retry policy
    #[derive(Debug)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
