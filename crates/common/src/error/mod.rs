//! Error classification shared by every homevoice layer
//!
//! Each layer owns its concrete `thiserror` enums. This module supplies the
//! vocabulary those enums use to describe themselves to generic machinery:
//!
//! - **`ErrorClassification`**: retryability, severity and criticality of an
//!   error value
//! - **`ErrorSeverity`**: a unified severity scale for logs and alerting
//!
//! The retry loop in [`crate::resilience`] only retries errors whose
//! classification reports `is_retryable() == true`, so transport adapters
//! must classify carefully: a malformed payload retried three times is still
//! malformed.
//!
//! ## Severity Levels
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Unknown device, pending confirmation |
//! | **Warning** | Degraded but operational | Circuit open, transient disconnect |
//! | **Error** | Failure requiring attention | Retries exhausted, invalid payload |
//! | **Critical** | System integrity at risk | Internal invariant violations |
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use homevoice_common::error::{ErrorClassification, ErrorSeverity};
//!
//! #[derive(Debug)]
//! enum LinkError {
//!     Dropped,
//!     BadFrame,
//! }
//!
//! impl ErrorClassification for LinkError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, Self::Dropped)
//!     }
//!
//!     fn severity(&self) -> ErrorSeverity {
//!         match self {
//!             Self::Dropped => ErrorSeverity::Warning,
//!             Self::BadFrame => ErrorSeverity::Error,
//!         }
//!     }
//! }
//!
//! assert!(LinkError::Dropped.is_retryable());
//! assert!(!LinkError::BadFrame.is_critical());
//! assert_eq!(LinkError::Dropped.retry_after(), None::<Duration>);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Standard interface for classifying errors by their characteristics
///
/// Implemented by every error type that can flow through a retry loop or a
/// circuit breaker.
pub trait ErrorClassification {
    /// Whether repeating the same operation might succeed
    ///
    /// Transient conditions (dropped connections, timeouts) are retryable;
    /// malformed input and policy rejections are not.
    fn is_retryable(&self) -> bool;

    /// Severity used for log levels and alerting
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error requires immediate operator attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested delay before retrying, when the error carries one
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Unified severity scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational, expected conditions
    Info,
    /// Degraded but operational
    Warning,
    /// Failure requiring attention
    Error,
    /// System integrity at risk
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl ErrorClassification for std::io::Error {
    fn is_retryable(&self) -> bool {
        use std::io::ErrorKind;

        matches!(
            self.kind(),
            ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::BrokenPipe
                | ErrorKind::TimedOut
                | ErrorKind::Interrupted
                | ErrorKind::WouldBlock
        )
    }

    fn severity(&self) -> ErrorSeverity {
        if self.is_retryable() {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        }
    }
}
