//! Assembled device-command execution stack.
//!
//! Builds everything between the orchestrator and the hub transport from a
//! single [`AssistantConfig`]: breaker telemetry, the breaker registry, the
//! messaging client and the action executor.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use homevoice_domain::{ActionRequest, AssistantConfig};
//! use homevoice_infra::messaging::LoopbackHub;
//! use homevoice_infra::services::ExecutionStack;
//!
//! # async fn example() -> homevoice_domain::Result<()> {
//! let stack = ExecutionStack::build(&AssistantConfig::default(), Arc::new(LoopbackHub::new()))?;
//! let batch = stack
//!     .executor()
//!     .process(&[ActionRequest::new("hallway_light", "onoff", true)], false)
//!     .await?;
//! println!("{}", batch.status());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use homevoice_common::resilience::BreakerRegistry;
use homevoice_core::{ActionExecutor, DeviceMessaging, HubTransport};
use homevoice_domain::{AssistantConfig, HomeVoiceError, Result};
use tracing::info;

use crate::messaging::{registry_from_config, MessagingClient};
use crate::observability::BreakerTelemetry;

/// Messaging client, executor and breaker registry sharing one transport
pub struct ExecutionStack {
    client: Arc<MessagingClient>,
    executor: ActionExecutor,
    breakers: Arc<BreakerRegistry>,
    telemetry: BreakerTelemetry,
}

impl ExecutionStack {
    /// Wire the stack described by `config` on top of `transport`
    ///
    /// # Errors
    /// Returns `HomeVoiceError::Config` if `config` is invalid, or
    /// `HomeVoiceError::Internal` if metrics cannot be registered.
    pub fn build(config: &AssistantConfig, transport: Arc<dyn HubTransport>) -> Result<Self> {
        config.validate()?;

        let telemetry = BreakerTelemetry::new()?;
        let breakers = Arc::new(registry_from_config(&config.breakers, telemetry.observer())?);
        let client = MessagingClient::new(transport, &breakers)
            .map_err(|e| HomeVoiceError::Config(e.to_string()))?
            .with_auto_reconnect(config.hub.auto_reconnect);
        let client = Arc::new(client);
        let messaging: Arc<dyn DeviceMessaging> = client.clone();
        let executor = ActionExecutor::from_config(messaging, config);

        info!(
            hub = %config.hub.host,
            port = config.hub.port,
            devices = config.devices.len(),
            rules = config.approval.rules.len(),
            "execution stack ready"
        );
        Ok(Self { client, executor, breakers, telemetry })
    }

    pub fn client(&self) -> &Arc<MessagingClient> {
        &self.client
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    pub fn telemetry(&self) -> &BreakerTelemetry {
        &self.telemetry
    }

    /// Connect the messaging client to the hub
    ///
    /// # Errors
    /// Returns `HomeVoiceError::Messaging` if the connection fails.
    pub async fn start(&self) -> Result<()> {
        self.client.connect().await.map_err(|e| HomeVoiceError::Messaging(e.to_string()))
    }

    /// Disconnect the messaging client from the hub
    ///
    /// # Errors
    /// Returns `HomeVoiceError::Messaging` if the transport reports an error.
    pub async fn shutdown(&self) -> Result<()> {
        self.client.disconnect().await.map_err(|e| HomeVoiceError::Messaging(e.to_string()))
    }
}
