//! Port interfaces for hub messaging

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{MessagingError, TransportError};

/// Callback invoked with `(topic, payload)` for every delivered message
pub type MessageHandler = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Raw publish/subscribe transport to the home-automation hub
///
/// Implementations know nothing about retries or circuit breakers; they
/// report each failure as a [`TransportError`] and leave recovery to the
/// caller.
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// Open the connection to the hub
    async fn connect(&self) -> Result<(), TransportError>;

    /// Close the connection; closing an unconnected transport is a no-op
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Publish `payload` on `topic`
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), TransportError>;

    /// Register `handler` for messages on `topic`
    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError>;

    /// Read the last known value published on a status topic
    async fn query_status(&self, topic: &str) -> Result<Value, TransportError>;
}

/// Guarded messaging as seen by the action executor
#[async_trait]
pub trait DeviceMessaging: Send + Sync {
    /// Publish a command payload
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), MessagingError>;

    /// Read a device status topic
    async fn query_status(&self, topic: &str) -> Result<Value, MessagingError>;
}
