//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for HomeVoice
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum HomeVoiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("Circuit open: {0}")]
    CircuitOpen(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for HomeVoice operations
pub type Result<T> = std::result::Result<T, HomeVoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_with_type_tag() {
        let error = HomeVoiceError::CircuitOpen("publish".to_string());

        let json = serde_json::to_value(&error).expect("serialize error");

        assert_eq!(json, serde_json::json!({ "type": "CircuitOpen", "message": "publish" }));
        assert_eq!(error.to_string(), "Circuit open: publish");
    }

    #[test]
    fn test_error_round_trips_through_json() {
        let error = HomeVoiceError::Config("hub.port must be non-zero".to_string());

        let json = serde_json::to_string(&error).expect("serialize error");
        let decoded: HomeVoiceError = serde_json::from_str(&json).expect("deserialize error");

        assert_eq!(decoded, error);
    }
}
