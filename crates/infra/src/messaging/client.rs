//! Messaging client with per-category circuit breakers
//!
//! Wraps a [`HubTransport`] so that publishing, subscribing and status
//! queries each run through their own circuit breaker (`publish`,
//! `subscribe`, `query_status`). A failing category trips only its own
//! breaker; the others keep working.
//!
//! Connection lifecycle calls are serialized against in-flight operations
//! with a `tokio::sync::RwLock`: operations share the read side,
//! `connect`/`disconnect` take the write side. An operation holds the read
//! side for its whole retry loop, so `disconnect` may wait up to the
//! breaker's `max_elapsed` budget. Auto-reconnects from concurrent
//! operations are serialized by a separate mutex, so one disconnected
//! period opens at most one connection.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use homevoice_common::resilience::{
    BreakerRegistry, CircuitBreaker, CircuitBreakerMetrics, ConfigResult,
};
use homevoice_core::{DeviceMessaging, HubTransport, MessageHandler, MessagingError, TransportError};
use homevoice_domain::constants::{BREAKER_PUBLISH, BREAKER_QUERY_STATUS, BREAKER_SUBSCRIBE};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Breaker-guarded access to the hub
pub struct MessagingClient {
    transport: Arc<dyn HubTransport>,
    lifecycle: RwLock<()>,
    reconnect: Mutex<()>,
    connected: AtomicBool,
    auto_reconnect: bool,
    publish_breaker: Arc<CircuitBreaker>,
    subscribe_breaker: Arc<CircuitBreaker>,
    status_breaker: Arc<CircuitBreaker>,
}

impl MessagingClient {
    /// Create a client taking its three breakers from `breakers`
    ///
    /// The client starts disconnected with auto-reconnect enabled.
    ///
    /// # Errors
    /// Returns `ConfigError` if a breaker configuration in the registry is
    /// invalid.
    pub fn new(transport: Arc<dyn HubTransport>, breakers: &BreakerRegistry) -> ConfigResult<Self> {
        Ok(Self {
            transport,
            lifecycle: RwLock::new(()),
            reconnect: Mutex::new(()),
            connected: AtomicBool::new(false),
            auto_reconnect: true,
            publish_breaker: breakers.get_or_create(BREAKER_PUBLISH)?,
            subscribe_breaker: breakers.get_or_create(BREAKER_SUBSCRIBE)?,
            status_breaker: breakers.get_or_create(BREAKER_QUERY_STATUS)?,
        })
    }

    /// Connect on demand when an operation finds the client disconnected
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Connect to the hub; a no-op when already connected
    ///
    /// # Errors
    /// Returns the transport error if the connection attempt fails.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<(), TransportError> {
        let _lifecycle = self.lifecycle.write().await;
        if self.is_connected() {
            debug!("already connected to hub");
            return Ok(());
        }
        self.transport.connect().await?;
        self.connected.store(true, Ordering::Release);
        info!("connected to hub");
        Ok(())
    }

    /// Disconnect from the hub; a no-op when not connected
    ///
    /// # Errors
    /// Returns the transport error if the disconnect fails; the client is
    /// considered disconnected either way.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        let _lifecycle = self.lifecycle.write().await;
        if !self.connected.swap(false, Ordering::AcqRel) {
            debug!("already disconnected from hub");
            return Ok(());
        }
        self.transport.disconnect().await?;
        info!("disconnected from hub");
        Ok(())
    }

    /// Publish `payload` on `topic` through the `publish` breaker
    ///
    /// # Errors
    /// Returns `MessagingError` on rejection, exhausted retries, timeout or
    /// a non-retryable transport error.
    #[instrument(skip(self, payload))]
    pub async fn publish(&self, topic: &str, payload: &Value) -> Result<(), MessagingError> {
        let transport = &self.transport;
        self.guarded(&self.publish_breaker, move || transport.publish(topic, payload)).await
    }

    /// Subscribe `handler` to `topic` through the `subscribe` breaker
    ///
    /// Retry covers only the subscription call; delivered messages are not
    /// guarded.
    ///
    /// # Errors
    /// Returns `MessagingError` if the subscription cannot be established.
    #[instrument(skip(self, handler))]
    pub async fn subscribe(
        &self,
        topic: &str,
        handler: MessageHandler,
    ) -> Result<(), MessagingError> {
        let transport = &self.transport;
        self.guarded(&self.subscribe_breaker, move || {
            transport.subscribe(topic, Arc::clone(&handler))
        })
        .await
    }

    /// Read a status topic through the `query_status` breaker
    ///
    /// # Errors
    /// Returns `MessagingError` if the status cannot be read.
    #[instrument(skip(self))]
    pub async fn query_status(&self, topic: &str) -> Result<Value, MessagingError> {
        let transport = &self.transport;
        self.guarded(&self.status_breaker, move || transport.query_status(topic)).await
    }

    /// Metrics of the three messaging breakers
    pub fn breaker_metrics(&self) -> Vec<CircuitBreakerMetrics> {
        [&self.publish_breaker, &self.subscribe_breaker, &self.status_breaker]
            .iter()
            .map(|breaker| breaker.metrics())
            .collect()
    }

    async fn guarded<T, F, Fut>(
        &self,
        breaker: &CircuitBreaker,
        mut operation: F,
    ) -> Result<T, MessagingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let _lifecycle = self.lifecycle.read().await;

        // Without auto-reconnect there is nothing a retry could fix.
        if !self.auto_reconnect && !self.is_connected() {
            return Err(MessagingError::Transport {
                breaker: breaker.name().to_string(),
                source: TransportError::NotConnected,
            });
        }

        let client = self;
        breaker
            .execute_as(breaker.name(), move || {
                let attempt = operation();
                async move {
                    client.ensure_connected().await?;
                    let result = attempt.await;
                    if let Err(TransportError::Connection(_) | TransportError::NotConnected) =
                        &result
                    {
                        client.connected.store(false, Ordering::Release);
                    }
                    result
                }
            })
            .await
            .map_err(MessagingError::from)
    }

    async fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }
        if !self.auto_reconnect {
            return Err(TransportError::NotConnected);
        }

        let _reconnect = self.reconnect.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        if let Err(error) = self.transport.connect().await {
            warn!(error = %error, "reconnect attempt failed");
            return Err(error);
        }
        self.connected.store(true, Ordering::Release);
        info!("reconnected to hub");
        Ok(())
    }
}

#[async_trait]
impl DeviceMessaging for MessagingClient {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), MessagingError> {
        MessagingClient::publish(self, topic, payload).await
    }

    async fn query_status(&self, topic: &str) -> Result<Value, MessagingError> {
        MessagingClient::query_status(self, topic).await
    }
}
