//! Error types for resilience operations

use std::time::Duration;

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Simple configuration error for validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}

/// Configuration result type using simple config errors
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced by a circuit breaker guarded call
///
/// Generic over the underlying operation error `E` so callers keep the
/// original failure. `CircuitOpen` is a routine outcome, not an exceptional
/// one: the operation was never invoked.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Breaker is open; the operation was not invoked
    #[error("circuit breaker '{breaker}' is open, rejecting calls")]
    CircuitOpen { breaker: String },

    /// Every permitted attempt failed with a retryable error
    #[error("circuit breaker '{breaker}': retries exhausted after {attempts} attempts")]
    RetriesExhausted {
        breaker: String,
        attempts: u32,
        #[source]
        source: E,
    },

    /// The elapsed budget ran out while an attempt was still running
    #[error("circuit breaker '{breaker}': operation timed out after {elapsed:?}")]
    Timeout { breaker: String, attempts: u32, elapsed: Duration },

    /// The operation failed with an error that is never retried
    #[error("circuit breaker '{breaker}': {source}")]
    NonRetryable {
        breaker: String,
        #[source]
        source: E,
    },
}

impl<E> ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Name of the breaker that produced this error
    pub fn breaker(&self) -> &str {
        match self {
            Self::CircuitOpen { breaker }
            | Self::RetriesExhausted { breaker, .. }
            | Self::Timeout { breaker, .. }
            | Self::NonRetryable { breaker, .. } => breaker,
        }
    }

    /// Whether the call was rejected without invoking the operation
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether this outcome counted as a breaker failure
    pub fn counts_as_failure(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. } | Self::Timeout { .. })
    }

    /// The last underlying operation error, if one was observed
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::RetriesExhausted { source, .. } | Self::NonRetryable { source, .. } => {
                Some(source)
            }
            Self::CircuitOpen { .. } | Self::Timeout { .. } => None,
        }
    }

    /// Consume the error and return the underlying operation error, if any
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::RetriesExhausted { source, .. } | Self::NonRetryable { source, .. } => {
                Some(source)
            }
            Self::CircuitOpen { .. } | Self::Timeout { .. } => None,
        }
    }
}

impl<E> ErrorClassification for ResilienceError<E>
where
    E: std::error::Error + ErrorClassification + Send + Sync + 'static,
{
    fn is_retryable(&self) -> bool {
        // The breaker already spent the retry budget; only a timeout may be
        // worth repeating at a higher level.
        matches!(self, Self::Timeout { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CircuitOpen { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::RetriesExhausted { .. } => ErrorSeverity::Error,
            Self::NonRetryable { source, .. } => source.severity(),
        }
    }
}

/// Result type for resilience operations
pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestError;

    /// Validates `ResilienceError` accessors for each variant.
    ///
    /// Assertions:
    /// - Confirms `breaker()` returns the breaker name for every variant.
    /// - Confirms only exhaustion and timeout count as breaker failures.
    /// - Confirms the operation error is preserved where one exists.
    #[test]
    fn test_resilience_error_accessors() {
        let open: ResilienceError<TestError> =
            ResilienceError::CircuitOpen { breaker: "publish".into() };
        let exhausted = ResilienceError::RetriesExhausted {
            breaker: "publish".into(),
            attempts: 4,
            source: TestError::Transient,
        };
        let timeout: ResilienceError<TestError> = ResilienceError::Timeout {
            breaker: "publish".into(),
            attempts: 2,
            elapsed: Duration::from_secs(2),
        };
        let fatal =
            ResilienceError::NonRetryable { breaker: "publish".into(), source: TestError::Fatal };

        for error in [&open, &exhausted, &timeout, &fatal] {
            assert_eq!(error.breaker(), "publish");
        }
        assert!(open.is_circuit_open());
        assert!(!open.counts_as_failure());
        assert!(exhausted.counts_as_failure());
        assert!(timeout.counts_as_failure());
        assert!(!fatal.counts_as_failure());
        assert_eq!(exhausted.operation_error(), Some(&TestError::Transient));
        assert_eq!(fatal.into_operation_error(), Some(TestError::Fatal));
        assert_eq!(timeout.operation_error(), None);
    }

    #[test]
    fn test_resilience_error_display() {
        let open: ResilienceError<TestError> =
            ResilienceError::CircuitOpen { breaker: "query_status".into() };
        assert_eq!(open.to_string(), "circuit breaker 'query_status' is open, rejecting calls");

        let exhausted = ResilienceError::RetriesExhausted {
            breaker: "publish".into(),
            attempts: 4,
            source: TestError::Transient,
        };
        assert_eq!(
            exhausted.to_string(),
            "circuit breaker 'publish': retries exhausted after 4 attempts"
        );
    }

    #[test]
    fn test_resilience_error_classification() {
        let open: ResilienceError<TestError> =
            ResilienceError::CircuitOpen { breaker: "publish".into() };
        let fatal =
            ResilienceError::NonRetryable { breaker: "publish".into(), source: TestError::Fatal };

        assert!(!open.is_retryable());
        assert_eq!(open.severity(), ErrorSeverity::Warning);
        assert_eq!(fatal.severity(), TestError::Fatal.severity());
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::invalid("success_threshold must be greater than 0");
        assert_eq!(
            error.to_string(),
            "Invalid configuration: success_threshold must be greater than 0"
        );
    }
}
