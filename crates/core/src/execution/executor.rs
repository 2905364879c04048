//! Action executor - batch command processing
//!
//! Takes the action plan produced upstream, gates it behind the approval
//! policy, publishes each valid action to its device command topic and
//! aggregates the per-action outcomes into a [`BatchResult`].
//!
//! Per-action failures (validation, unknown device, messaging) become
//! failed results and never abort the rest of the batch. Actions run with
//! bounded parallelism and results keep the input order.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use homevoice_domain::constants::{
    DEADLINE_EXCEEDED_MESSAGE, DEFAULT_MAX_CONCURRENCY, MISSING_PARAMETERS_MESSAGE,
};
use homevoice_domain::{
    ActionRequest, ActionResult, AssistantConfig, BatchResult, DeviceCatalogue, HubConfig,
};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::approval::ApprovalPolicy;
use crate::errors::{CommandError, ExecutionError};
use crate::messaging::DeviceMessaging;

/// Validated action, borrowed from its request
struct Command<'a> {
    device_id: &'a str,
    capability: &'a str,
    value: &'a Value,
}

/// Executes approved batches of device actions
pub struct ActionExecutor {
    messaging: Arc<dyn DeviceMessaging>,
    policy: ApprovalPolicy,
    catalogue: DeviceCatalogue,
    hub: HubConfig,
    max_concurrency: usize,
    deadline: Option<Duration>,
}

impl ActionExecutor {
    /// Create an executor with default topics, concurrency and no deadline
    pub fn new(
        messaging: Arc<dyn DeviceMessaging>,
        policy: ApprovalPolicy,
        catalogue: DeviceCatalogue,
    ) -> Self {
        Self {
            messaging,
            policy,
            catalogue,
            hub: HubConfig::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            deadline: None,
        }
    }

    /// Build an executor from the approval, device, hub and execution
    /// sections of `config`
    pub fn from_config(messaging: Arc<dyn DeviceMessaging>, config: &AssistantConfig) -> Self {
        Self::new(messaging, ApprovalPolicy::from_config(&config.approval), config.catalogue())
            .with_hub(config.hub.clone())
            .with_max_concurrency(config.execution.max_concurrency)
            .with_deadline(config.execution.deadline())
    }

    /// Topic layout used for command and status topics
    #[must_use]
    pub fn with_hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }

    /// Maximum number of actions in flight at once (at least 1)
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Default overall deadline applied by [`Self::process`]
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn policy(&self) -> &ApprovalPolicy {
        &self.policy
    }

    /// Process a batch under the executor's default deadline
    ///
    /// # Errors
    /// Returns `ExecutionError::EmptyBatch` if `actions` is empty. Every
    /// other failure is reported per action inside the `BatchResult`.
    pub async fn process(
        &self,
        actions: &[ActionRequest],
        confirmation_required: bool,
    ) -> Result<BatchResult, ExecutionError> {
        self.process_with_deadline(actions, confirmation_required, self.deadline).await
    }

    /// Process a batch, cutting it off after `deadline` if one is given
    ///
    /// Actions not started before the deadline, and actions still running
    /// when it passes, are recorded as failed.
    ///
    /// # Errors
    /// Returns `ExecutionError::EmptyBatch` if `actions` is empty.
    #[instrument(skip(self, actions), fields(actions = actions.len()))]
    pub async fn process_with_deadline(
        &self,
        actions: &[ActionRequest],
        confirmation_required: bool,
        deadline: Option<Duration>,
    ) -> Result<BatchResult, ExecutionError> {
        if actions.is_empty() {
            return Err(ExecutionError::EmptyBatch);
        }

        if confirmation_required && !self.policy.approves_all(actions) {
            info!(
                pending = self.pending_actions(actions).len(),
                "batch held for user confirmation"
            );
            return Ok(BatchResult::pending_confirmation());
        }

        let deadline = deadline.map(|budget| Instant::now() + budget);
        let results: Vec<ActionResult> = stream::iter(actions)
            .map(|action| self.run_action(action, deadline))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let Some(batch) = BatchResult::from_results(results) else {
            return Err(ExecutionError::EmptyBatch);
        };
        info!(
            status = %batch.status(),
            succeeded = batch.success_count(),
            failed = batch.failure_count(),
            "processed action batch"
        );
        Ok(batch)
    }

    /// Actions in `actions` that still need explicit confirmation
    pub fn pending_actions<'a>(&self, actions: &'a [ActionRequest]) -> Vec<&'a ActionRequest> {
        actions.iter().filter(|action| !self.policy.approves(action)).collect()
    }

    /// Read the current status of `device_id` from its status topic
    ///
    /// # Errors
    /// Returns `CommandError::UnknownTarget` for devices outside the
    /// catalogue, or `CommandError::Messaging` if the query fails.
    #[instrument(skip(self))]
    pub async fn query_device_status(&self, device_id: &str) -> Result<Value, CommandError> {
        if device_id.is_empty() {
            return Err(CommandError::validation(MISSING_PARAMETERS_MESSAGE));
        }
        if !self.catalogue.accepts(device_id) {
            return Err(CommandError::unknown_target(device_id));
        }
        let topic = self.hub.status_topic(device_id);
        Ok(self.messaging.query_status(&topic).await?)
    }

    async fn run_action(&self, action: &ActionRequest, deadline: Option<Instant>) -> ActionResult {
        let outcome = match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(CommandError::Timeout(DEADLINE_EXCEEDED_MESSAGE.to_string()))
            }
            Some(deadline) => tokio::time::timeout_at(deadline, self.execute(action))
                .await
                .unwrap_or_else(|_| {
                    Err(CommandError::Timeout(DEADLINE_EXCEEDED_MESSAGE.to_string()))
                }),
            None => self.execute(action).await,
        };

        match outcome {
            Ok(()) => {
                debug!(%action, "action succeeded");
                ActionResult::success(action)
            }
            Err(error) => {
                warn!(%action, error = %error, "action failed");
                ActionResult::failed(action, error.to_string())
            }
        }
    }

    async fn execute(&self, action: &ActionRequest) -> Result<(), CommandError> {
        let command = self.validate(action)?;
        let topic = self.hub.command_topic(command.device_id, command.capability);
        let payload = json!({
            "device": command.device_id,
            "capability": command.capability,
            "value": command.value,
        });
        self.messaging.publish(&topic, &payload).await?;
        Ok(())
    }

    fn validate<'a>(&self, action: &'a ActionRequest) -> Result<Command<'a>, CommandError> {
        let (device_id, capability, value) = action
            .parts()
            .filter(|(device_id, capability, value)| {
                !device_id.is_empty() && !capability.is_empty() && !value.is_null()
            })
            .ok_or_else(|| CommandError::validation(MISSING_PARAMETERS_MESSAGE))?;

        if !self.catalogue.accepts(device_id) {
            return Err(CommandError::unknown_target(device_id));
        }
        if let Some(device) = self.catalogue.get(device_id) {
            if !device.supports(capability) {
                return Err(CommandError::validation(format!(
                    "capability {capability} not supported by device {device_id}"
                )));
            }
        }
        Ok(Command { device_id, capability, value })
    }
}
