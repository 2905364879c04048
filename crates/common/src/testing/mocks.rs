//! Mock implementations for breaker and retry tests
//!
//! Provides a recording observer, a scripted operation and a small error type
//! with a fixed classification.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};
use crate::resilience::{BreakerObserver, CircuitState, OperationStatus};

/// Error with a fixed retry classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    /// Classified as retryable
    #[error("transient failure")]
    Transient,
    /// Classified as non-retryable
    #[error("fatal failure")]
    Fatal,
}

impl ErrorClassification for TestError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Transient => ErrorSeverity::Warning,
            Self::Fatal => ErrorSeverity::Error,
        }
    }
}

/// One event captured by [`RecordingObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerEvent {
    StateChange { breaker: String, from: CircuitState, to: CircuitState },
    Operation { breaker: String, operation: String, status: OperationStatus },
    Recovery { breaker: String, duration: Duration },
}

/// Observer that keeps every event in arrival order
///
/// # Examples
///
/// ```
/// use homevoice_common::resilience::{BreakerObserver, CircuitState};
/// use homevoice_common::testing::RecordingObserver;
///
/// let observer = RecordingObserver::new();
/// observer.on_state_change("publish", CircuitState::Closed, CircuitState::Open);
///
/// assert_eq!(observer.state_changes(), vec![(CircuitState::Closed, CircuitState::Open)]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<BreakerEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far
    #[must_use]
    pub fn events(&self) -> Vec<BreakerEvent> {
        self.events.lock().clone()
    }

    /// `(from, to)` pairs of every state change, across all breakers
    #[must_use]
    pub fn state_changes(&self) -> Vec<(CircuitState, CircuitState)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                BreakerEvent::StateChange { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// State changes of one breaker
    #[must_use]
    pub fn state_changes_for(&self, name: &str) -> Vec<(CircuitState, CircuitState)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                BreakerEvent::StateChange { breaker, from, to } if breaker == name => {
                    Some((*from, *to))
                }
                _ => None,
            })
            .collect()
    }

    /// Statuses of every finished call
    #[must_use]
    pub fn statuses(&self) -> Vec<OperationStatus> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                BreakerEvent::Operation { status, .. } => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl BreakerObserver for RecordingObserver {
    fn on_state_change(&self, breaker: &str, from: CircuitState, to: CircuitState) {
        let event = BreakerEvent::StateChange { breaker: breaker.to_string(), from, to };
        self.events.lock().push(event);
    }

    fn on_operation_result(&self, breaker: &str, operation: &str, status: OperationStatus) {
        self.events.lock().push(BreakerEvent::Operation {
            breaker: breaker.to_string(),
            operation: operation.to_string(),
            status,
        });
    }

    fn on_recovery(&self, breaker: &str, duration: Duration) {
        self.events.lock().push(BreakerEvent::Recovery { breaker: breaker.to_string(), duration });
    }
}

/// Operation that replays a scripted sequence of outcomes
///
/// Each invocation pops the next scripted outcome; once the script is
/// exhausted the fallback outcome repeats. Clones share the script and the
/// invocation counter.
#[derive(Debug, Clone)]
pub struct ScriptedOperation {
    calls: Arc<AtomicU32>,
    script: Arc<Mutex<VecDeque<Result<(), TestError>>>>,
    fallback: Result<(), TestError>,
}

impl ScriptedOperation {
    pub fn new(script: Vec<Result<(), TestError>>, fallback: Result<(), TestError>) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            script: Arc::new(Mutex::new(script.into())),
            fallback,
        }
    }

    pub fn always_succeeding() -> Self {
        Self::new(Vec::new(), Ok(()))
    }

    pub fn always_failing(error: TestError) -> Self {
        Self::new(Vec::new(), Err(error))
    }

    /// Fail `times` times with `error`, then succeed
    pub fn failing_times(times: usize, error: TestError) -> Self {
        Self::new(vec![Err(error); times], Ok(()))
    }

    /// Invoke the operation once
    pub fn call(&self) -> impl Future<Output = Result<(), TestError>> + Send + 'static {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        async move { outcome }
    }

    /// Number of invocations so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_operation_replays_then_falls_back() {
        let operation = ScriptedOperation::failing_times(2, TestError::Transient);

        tokio_test::block_on(async {
            assert_eq!(operation.call().await, Err(TestError::Transient));
            assert_eq!(operation.clone().call().await, Err(TestError::Transient));
            assert_eq!(operation.call().await, Ok(()));
            assert_eq!(operation.call().await, Ok(()));
        });
        assert_eq!(operation.calls(), 4);
    }

    #[test]
    fn test_recording_observer_filters_by_breaker() {
        let observer = RecordingObserver::new();
        observer.on_state_change("publish", CircuitState::Closed, CircuitState::Open);
        observer.on_state_change("subscribe", CircuitState::Closed, CircuitState::Open);
        observer.on_operation_result("publish", "execute", OperationStatus::Failure);

        assert_eq!(observer.state_changes().len(), 2);
        assert_eq!(
            observer.state_changes_for("subscribe"),
            vec![(CircuitState::Closed, CircuitState::Open)]
        );
        assert_eq!(observer.statuses(), vec![OperationStatus::Failure]);

        observer.clear();
        assert!(observer.events().is_empty());
    }
}
