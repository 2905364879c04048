//! Error taxonomy for device command execution
//!
//! - [`TransportError`]: what the hub transport reports; connection-level
//!   failures are transient and retried
//! - [`MessagingError`]: a transport call after breaker and retry handling
//! - [`CommandError`]: why a single action failed
//! - [`ExecutionError`]: caller-contract violations that escape a batch

use std::time::Duration;

use homevoice_common::{ErrorClassification, ErrorSeverity, ResilienceError};
use homevoice_domain::HomeVoiceError;
use thiserror::Error;

/// Errors reported by a [`HubTransport`](crate::messaging::HubTransport)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport timed out after {0:?}")]
    Timeout(Duration),

    #[error("not connected to hub")]
    NotConnected,

    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("hub rejected request: {0}")]
    Rejected(String),
}

impl TransportError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

impl ErrorClassification for TransportError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_) | Self::NotConnected)
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::NotConnected => ErrorSeverity::Warning,
            Self::Malformed(_) | Self::Rejected(_) => ErrorSeverity::Error,
        }
    }
}

/// Failure of a guarded messaging call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    #[error("{breaker} circuit is open")]
    CircuitOpen { breaker: String },

    #[error("{breaker} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        breaker: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("{breaker} timed out after {elapsed:?} ({attempts} attempts)")]
    Timeout { breaker: String, attempts: u32, elapsed: Duration },

    #[error("{breaker} failed: {source}")]
    Transport {
        breaker: String,
        #[source]
        source: TransportError,
    },
}

impl MessagingError {
    pub fn breaker(&self) -> &str {
        match self {
            Self::CircuitOpen { breaker }
            | Self::RetriesExhausted { breaker, .. }
            | Self::Timeout { breaker, .. }
            | Self::Transport { breaker, .. } => breaker,
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Underlying transport error, when one was observed
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::RetriesExhausted { source, .. } | Self::Transport { source, .. } => Some(source),
            Self::CircuitOpen { .. } | Self::Timeout { .. } => None,
        }
    }
}

impl From<ResilienceError<TransportError>> for MessagingError {
    fn from(error: ResilienceError<TransportError>) -> Self {
        match error {
            ResilienceError::CircuitOpen { breaker } => Self::CircuitOpen { breaker },
            ResilienceError::RetriesExhausted { breaker, attempts, source } => {
                Self::RetriesExhausted { breaker, attempts, source }
            }
            ResilienceError::Timeout { breaker, attempts, elapsed } => {
                Self::Timeout { breaker, attempts, elapsed }
            }
            ResilienceError::NonRetryable { breaker, source } => {
                Self::Transport { breaker, source }
            }
        }
    }
}

impl ErrorClassification for MessagingError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::CircuitOpen { .. } | Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::RetriesExhausted { .. } => ErrorSeverity::Error,
            Self::Transport { source, .. } => source.severity(),
        }
    }
}

impl From<MessagingError> for HomeVoiceError {
    fn from(error: MessagingError) -> Self {
        match error {
            MessagingError::CircuitOpen { breaker } => Self::CircuitOpen(breaker),
            timeout @ MessagingError::Timeout { .. } => Self::Timeout(timeout.to_string()),
            other => Self::Messaging(other.to_string()),
        }
    }
}

/// Why a single device action failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{0}")]
    Validation(String),

    #[error("unknown device: {device_id}")]
    UnknownTarget { device_id: String },

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("{0}")]
    Timeout(String),
}

impl CommandError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unknown_target(device_id: impl Into<String>) -> Self {
        Self::UnknownTarget { device_id: device_id.into() }
    }
}

impl From<CommandError> for HomeVoiceError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::Validation(message) => Self::InvalidInput(message),
            CommandError::UnknownTarget { device_id } => Self::NotFound(device_id),
            CommandError::Messaging(error) => error.into(),
            CommandError::Timeout(message) => Self::Timeout(message),
        }
    }
}

/// Caller-contract violations returned by
/// [`ActionExecutor::process`](crate::execution::ActionExecutor::process)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("action batch is empty")]
    EmptyBatch,
}

impl From<ExecutionError> for HomeVoiceError {
    fn from(error: ExecutionError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}
