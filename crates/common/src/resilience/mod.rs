//! Resilience patterns for unreliable networked operations
//!
//! This module provides the generic building blocks the messaging layer is
//! assembled from:
//! - **Retry**: bounded by an attempt cap and an elapsed budget, exponential
//!   backoff, retries only errors classified as transient
//! - **Circuit Breaker**: per-category failure isolation wrapping the retry
//!   loop
//! - **Registry**: explicit, injectable store of named breakers
//! - **Observers**: state-change and per-call hooks (`tracing`, Prometheus,
//!   fan-out)
//!
//! Everything is generic over the operation's error type. Domain crates
//! classify their errors with [`crate::error::ErrorClassification`] and the
//! default retry policy ([`policies::RetryTransient`]) reads that
//! classification.
//!
//! ## Time
//!
//! Open-timeout expiry reads a [`Clock`] (use [`MockClock`] in tests).
//! Backoff sleeps on the tokio timer, so tests pause tokio time instead.

pub mod circuit_breaker;
pub mod clock;
pub mod error;
pub mod metrics_export;
pub mod observer;
pub mod registry;
pub mod retry;

// Re-export circuit breaker types
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitState,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{ConfigError, ConfigResult, ResilienceError, ResilienceResult};
pub use metrics_export::{render_text, PrometheusBreakerObserver};
pub use observer::{
    BreakerObserver, CompositeObserver, NoOpObserver, OperationStatus, TracingObserver,
};
pub use registry::BreakerRegistry;
// Re-export retry types
pub use retry::{
    policies, BackoffStrategy, Jitter, RetryConfig, RetryConfigBuilder, RetryDecision, RetryError,
    RetryExecutor, RetryOutcome, RetryPolicy, RetryResult,
};
