//! Modular common utilities shared across homevoice crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error classification
//! - `runtime`: async resilience primitives (clock, retry, circuit breaker,
//!   breaker registry, observers, Prometheus export)
//! - `test-utils`: recording observers and scripted operations for tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, BreakerObserver, BreakerRegistry, CircuitBreaker, CircuitBreakerConfig,
    CircuitBreakerConfigBuilder, CircuitBreakerMetrics, CircuitState, Clock, CompositeObserver,
    Jitter, MockClock, NoOpObserver, OperationStatus, PrometheusBreakerObserver, ResilienceError,
    ResilienceResult, RetryConfig, RetryConfigBuilder, RetryDecision, RetryPolicy, SystemClock,
    TracingObserver,
};
