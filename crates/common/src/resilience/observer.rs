//! Observer hooks for circuit breaker events
//!
//! Breakers report to a [`BreakerObserver`] injected at construction. Every
//! callback runs after the breaker has released its state lock, so an
//! observer may call back into the breaker (for example to read metrics)
//! without deadlocking.
//!
//! ## Provided observers
//! - [`NoOpObserver`]: discards everything
//! - [`TracingObserver`]: structured `tracing` events
//! - [`CompositeObserver`]: fans each event out to several observers
//! - [`super::metrics_export::PrometheusBreakerObserver`]: Prometheus series

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::circuit_breaker::CircuitState;

/// Per-call outcome reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    /// The guarded operation eventually succeeded
    Success,
    /// The guarded operation failed (retries exhausted, timeout, or a
    /// non-retryable error)
    Failure,
    /// The breaker rejected the call without invoking the operation
    Rejected,
}

impl OperationStatus {
    /// Stable lowercase label, used as a metric label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives circuit breaker lifecycle and outcome notifications
pub trait BreakerObserver: Send + Sync {
    /// The breaker moved from `from` to `to`
    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState);

    /// One guarded call finished
    fn on_operation_result(&self, breaker: &str, operation: &str, status: OperationStatus);

    /// The breaker closed again after being open for `duration`
    fn on_recovery(&self, _breaker: &str, _duration: Duration) {}
}

/// Observer that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl BreakerObserver for NoOpObserver {
    fn on_state_change(&self, _breaker: &str, _from: CircuitState, _to: CircuitState) {}

    fn on_operation_result(&self, _breaker: &str, _operation: &str, _status: OperationStatus) {}
}

/// Observer that emits structured `tracing` events
///
/// Opening is logged at `warn`, closing and half-open probes at `info`,
/// per-call outcomes at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BreakerObserver for TracingObserver {
    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        match to {
            CircuitState::Open => {
                warn!(breaker, from = %from, to = %to, "circuit breaker opened");
            }
            CircuitState::HalfOpen | CircuitState::Closed => {
                info!(breaker, from = %from, to = %to, "circuit breaker state changed");
            }
        }
    }

    fn on_operation_result(&self, breaker: &str, operation: &str, status: OperationStatus) {
        debug!(breaker, operation, status = %status, "circuit breaker call finished");
    }

    fn on_recovery(&self, breaker: &str, duration: Duration) {
        info!(breaker, recovery_ms = duration.as_millis() as u64, "circuit breaker recovered");
    }
}

/// Observer that forwards every event to each inner observer in order
#[derive(Clone, Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn BreakerObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn BreakerObserver>>) -> Self {
        Self { observers }
    }

    /// Append an observer
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn BreakerObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver").field("observers", &self.observers.len()).finish()
    }
}

impl BreakerObserver for CompositeObserver {
    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        for observer in &self.observers {
            observer.on_state_change(breaker, from, to);
        }
    }

    fn on_operation_result(&self, breaker: &str, operation: &str, status: OperationStatus) {
        for observer in &self.observers {
            observer.on_operation_result(breaker, operation, status);
        }
    }

    fn on_recovery(&self, breaker: &str, duration: Duration) {
        for observer in &self.observers {
            observer.on_recovery(breaker, duration);
        }
    }
}
