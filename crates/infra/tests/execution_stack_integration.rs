//! End-to-end tests for the assembled execution stack
//!
//! Builds [`ExecutionStack`] from configuration on top of a [`LoopbackHub`]
//! and drives action batches through approval, validation, the messaging
//! breakers and the hub.

use std::sync::Arc;

use homevoice_common::resilience::CircuitState;
use homevoice_core::TransportError;
use homevoice_domain::{
    ActionOutcome, ActionRequest, ApprovalRule, AssistantConfig, BatchStatus, DeviceDescriptor,
    HomeVoiceError,
};
use homevoice_infra::messaging::{HubOperation, LoopbackHub};
use homevoice_infra::services::ExecutionStack;
use serde_json::json;

fn config() -> AssistantConfig {
    let mut config = AssistantConfig::default();
    config.devices = vec![
        DeviceDescriptor::new("hallway_light", "Hallway light")
            .in_zone("hallway")
            .with_capabilities(["onoff", "dim"]),
        DeviceDescriptor::new("kitchen_speaker", "Kitchen speaker").with_capabilities(["volume"]),
    ];
    config.approval.rules = vec![ApprovalRule::new("hallway_light", "onoff")];
    config
}

fn stack(hub: &Arc<LoopbackHub>) -> ExecutionStack {
    ExecutionStack::build(&config(), hub.clone()).expect("valid configuration")
}

/// Validates a batch with one known and one unknown device.
///
/// # Test Steps
/// 1. Submit a light command and a command for an unconfigured device
/// 2. Verify the batch is `partial_success` with results in input order
/// 3. Verify only the light command reached the hub
#[tokio::test]
async fn test_known_and_unknown_device_yield_partial_success() {
    let hub = Arc::new(LoopbackHub::new());
    let stack = stack(&hub);
    let actions = [
        ActionRequest::new("hallway_light", "onoff", true),
        ActionRequest::new("garage_door", "open", true),
    ];

    let batch = stack.executor().process(&actions, false).await.expect("non-empty batch");

    assert_eq!(batch.status(), BatchStatus::PartialSuccess);
    let results = batch.results();
    assert_eq!(results[0].outcome, ActionOutcome::Success);
    assert_eq!(results[1].outcome, ActionOutcome::Failed);
    assert_eq!(results[1].error_message.as_deref(), Some("unknown device: garage_door"));

    let published = hub.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "homey/hallway_light/onoff/set");
    assert_eq!(
        published[0].payload,
        json!({ "device": "hallway_light", "capability": "onoff", "value": true })
    );
}

/// Validates a batch needing confirmation performs no I/O.
#[tokio::test]
async fn test_unapproved_batch_is_held_for_confirmation() {
    let hub = Arc::new(LoopbackHub::new());
    let stack = stack(&hub);
    let actions = [
        ActionRequest::new("hallway_light", "onoff", true),
        ActionRequest::new("kitchen_speaker", "volume", 30),
    ];

    let batch = stack.executor().process(&actions, true).await.expect("non-empty batch");

    assert!(batch.is_pending_confirmation());
    assert!(batch.results().is_empty());
    assert_eq!(stack.executor().pending_actions(&actions), vec![&actions[1]]);
    assert_eq!(hub.calls(HubOperation::Connect), 0);
    assert_eq!(hub.calls(HubOperation::Publish), 0);
}

/// Validates device status reflects an executed command.
///
/// # Test Steps
/// 1. Start the stack and dim the hallway light
/// 2. Query the light's status through the executor
/// 3. Verify the unknown device query is rejected before any I/O
#[tokio::test]
async fn test_status_query_reflects_executed_command() -> anyhow::Result<()> {
    let hub = Arc::new(LoopbackHub::new());
    let stack = stack(&hub);
    stack.start().await?;

    let batch =
        stack.executor().process(&[ActionRequest::new("hallway_light", "dim", 0.5)], false).await?;
    assert_eq!(batch.status(), BatchStatus::Success);

    let status = stack.executor().query_device_status("hallway_light").await?;
    assert_eq!(status, json!({ "dim": 0.5 }));

    let unknown = stack.executor().query_device_status("garage_door").await;
    assert!(unknown.is_err());
    assert_eq!(hub.calls(HubOperation::QueryStatus), 1);

    stack.shutdown().await?;
    assert!(!hub.is_connected());
    Ok(())
}

/// Validates a hub outage fails the batch and is visible in telemetry.
///
/// # Test Steps
/// 1. Make every publish fail with a connection error
/// 2. Verify the batch is `failed` and the publish breaker opened
/// 3. Verify the Prometheus export shows the open publish breaker
#[tokio::test(start_paused = true)]
async fn test_hub_outage_fails_batch_and_opens_publish_breaker() {
    let hub = Arc::new(LoopbackHub::new());
    let stack = stack(&hub);
    hub.fail_always(HubOperation::Publish, TransportError::connection("hub unreachable"));

    let batch = stack
        .executor()
        .process(&[ActionRequest::new("hallway_light", "onoff", false)], false)
        .await
        .expect("non-empty batch");

    assert_eq!(batch.status(), BatchStatus::Failed);
    let publish = stack.breakers().get("publish").expect("publish breaker");
    assert_eq!(publish.state(), CircuitState::Open);

    let text = stack.telemetry().render().expect("render metrics");
    assert!(text.contains("circuit_breaker_state{breaker_name=\"publish\"} 1"));
    assert!(text.contains(
        "circuit_breaker_transitions_total{breaker_name=\"publish\",from=\"closed\",to=\"open\"} 1"
    ));
}

#[test]
fn test_build_rejects_invalid_configuration() {
    let mut invalid = config();
    invalid.execution.max_concurrency = 0;

    let result = ExecutionStack::build(&invalid, Arc::new(LoopbackHub::new()));

    assert!(matches!(result, Err(HomeVoiceError::Config(_))));
}
