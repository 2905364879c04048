//! Integration tests for the action executor
//!
//! Drives `ActionExecutor` through its public API against an in-memory
//! messaging mock: approval gating, per-action isolation, bounded
//! concurrency and the batch deadline.

mod support;

use std::sync::Arc;
use std::time::Duration;

use homevoice_core::{ActionExecutor, ApprovalPolicy, ExecutionError, MessagingError};
use homevoice_domain::{
    ActionOutcome, ActionRequest, ApprovalRule, AssistantConfig, BatchStatus, DeviceCatalogue,
    DeviceDescriptor,
};
use serde_json::json;
use support::messaging::MockDeviceMessaging;

fn catalogue() -> DeviceCatalogue {
    DeviceCatalogue::new([
        DeviceDescriptor::new("hallway_light", "Hallway light").with_capabilities(["onoff"]),
        DeviceDescriptor::new("thermostat", "Thermostat")
            .with_capabilities(["target_temperature"]),
        DeviceDescriptor::new("speaker", "Kitchen speaker"),
    ])
}

fn policy() -> ApprovalPolicy {
    ApprovalPolicy::new(vec![ApprovalRule::new("hallway_light", "onoff")])
}

fn executor(messaging: &Arc<MockDeviceMessaging>) -> ActionExecutor {
    ActionExecutor::new(Arc::clone(messaging) as _, policy(), catalogue())
}

/// Validates a known device and an unknown device yield partial success.
///
/// # Test Steps
/// 1. Submit one action for a configured device and one for an unknown id
/// 2. Verify the batch is `partial_success`
/// 3. Verify results are `[success, failed]` in input order
/// 4. Verify only the known device was published to
#[tokio::test]
async fn test_known_and_unknown_device_partial_success() {
    let messaging = Arc::new(MockDeviceMessaging::new());
    let executor = executor(&messaging);
    let actions = vec![
        ActionRequest::new("hallway_light", "onoff", true),
        ActionRequest::new("garage_door", "onoff", true),
    ];

    let batch = executor.process(&actions, false).await.expect("batch processed");

    assert_eq!(batch.status(), BatchStatus::PartialSuccess);
    let outcomes: Vec<_> = batch.results().iter().map(|result| result.outcome).collect();
    assert_eq!(outcomes, vec![ActionOutcome::Success, ActionOutcome::Failed]);
    assert_eq!(batch.results()[1].error_message.as_deref(), Some("unknown device: garage_door"));
    assert_eq!(messaging.published_topics(), vec!["homey/hallway_light/onoff/set".to_string()]);
}

/// Validates a batch needing confirmation performs no I/O.
///
/// # Test Steps
/// 1. Submit an approved and an unapproved action with confirmation required
/// 2. Verify the batch is `pending_confirmation` with no results
/// 3. Verify messaging was never called
/// 4. Verify `pending_actions` names only the unapproved action
#[tokio::test]
async fn test_confirmation_required_without_approval_is_pending() {
    let messaging = Arc::new(MockDeviceMessaging::new());
    let executor = executor(&messaging);
    let actions = vec![
        ActionRequest::new("hallway_light", "onoff", true),
        ActionRequest::new("thermostat", "target_temperature", 21),
    ];

    let batch = executor.process(&actions, true).await.expect("batch processed");

    assert_eq!(batch.status(), BatchStatus::PendingConfirmation);
    assert!(batch.results().is_empty());
    assert_eq!(messaging.calls(), 0);
    assert_eq!(executor.pending_actions(&actions), vec![&actions[1]]);
}

/// Validates a fully auto-approved batch runs even when confirmation is
/// required.
#[tokio::test]
async fn test_confirmation_required_with_full_approval_executes() {
    let messaging = Arc::new(MockDeviceMessaging::new());
    let executor = executor(&messaging);

    let batch = executor
        .process(&[ActionRequest::new("hallway_light", "onoff", false)], true)
        .await
        .expect("batch processed");

    assert_eq!(batch.status(), BatchStatus::Success);
    assert_eq!(
        messaging.published(),
        vec![(
            "homey/hallway_light/onoff/set".to_string(),
            json!({ "device": "hallway_light", "capability": "onoff", "value": false })
        )]
    );
}

/// Validates every action failing yields `failed`, including rejections.
///
/// # Test Steps
/// 1. Make the only valid device's topic fail with a circuit rejection
/// 2. Submit it alongside a malformed action
/// 3. Verify the batch is `failed` and both results carry messages
#[tokio::test]
async fn test_all_failures_yield_failed() {
    let messaging = Arc::new(MockDeviceMessaging::new());
    messaging.fail_topic(
        "homey/speaker/volume_set/set",
        MessagingError::CircuitOpen { breaker: "publish".into() },
    );
    let executor = executor(&messaging);
    let actions = vec![ActionRequest::new("speaker", "volume_set", 30), ActionRequest::default()];

    let batch = executor.process(&actions, false).await.expect("batch processed");

    assert_eq!(batch.status(), BatchStatus::Failed);
    assert_eq!(batch.failure_count(), 2);
    assert_eq!(batch.results()[0].error_message.as_deref(), Some("publish circuit is open"));
    assert_eq!(
        batch.results()[1].error_message.as_deref(),
        Some("missing required parameters")
    );
}

#[tokio::test]
async fn test_empty_batch_is_caller_error() {
    let messaging = Arc::new(MockDeviceMessaging::new());

    let result = executor(&messaging).process(&[], true).await;

    assert!(matches!(result, Err(ExecutionError::EmptyBatch)));
}

/// Validates bounded parallelism and result ordering.
///
/// # Test Steps
/// 1. Submit eight actions whose publishes take decreasing time
/// 2. Run with `max_concurrency = 4`
/// 3. Verify no more than four publishes overlapped
/// 4. Verify results follow input order, not completion order
#[tokio::test(start_paused = true)]
async fn test_bounded_concurrency_preserves_order() {
    let messaging = Arc::new(MockDeviceMessaging::new());
    let devices: Vec<String> = (0..8).map(|i| format!("plug_{i}")).collect();
    for (i, device) in devices.iter().enumerate() {
        let delay = Duration::from_millis(10 * (8 - i as u64));
        messaging.delay_topic(&format!("homey/{device}/onoff/set"), delay);
    }
    let executor = ActionExecutor::new(
        Arc::clone(&messaging) as _,
        ApprovalPolicy::default(),
        DeviceCatalogue::default(),
    )
    .with_max_concurrency(4);
    let actions: Vec<_> =
        devices.iter().map(|device| ActionRequest::new(device.as_str(), "onoff", true)).collect();

    let batch = executor.process(&actions, false).await.expect("batch processed");

    assert_eq!(batch.status(), BatchStatus::Success);
    assert_eq!(messaging.max_in_flight(), 4);
    let ids: Vec<_> =
        batch.results().iter().filter_map(|result| result.device_id.clone()).collect();
    assert_eq!(ids, devices);
}

/// Validates the batch deadline fails running and unstarted actions.
///
/// # Test Steps
/// 1. Give each publish a 100ms delay and run sequentially
/// 2. Process three actions with a 150ms deadline
/// 3. Verify the first succeeds, the second is cut off and the third never
///    starts
#[tokio::test(start_paused = true)]
async fn test_deadline_fails_remaining_actions() {
    let messaging = Arc::new(MockDeviceMessaging::new());
    for device in ["a", "b", "c"] {
        messaging.delay_topic(&format!("homey/{device}/onoff/set"), Duration::from_millis(100));
    }
    let executor = ActionExecutor::new(
        Arc::clone(&messaging) as _,
        ApprovalPolicy::default(),
        DeviceCatalogue::default(),
    )
    .with_max_concurrency(1);
    let actions: Vec<_> =
        ["a", "b", "c"].iter().map(|device| ActionRequest::new(*device, "onoff", true)).collect();

    let batch = executor
        .process_with_deadline(&actions, false, Some(Duration::from_millis(150)))
        .await
        .expect("batch processed");

    assert_eq!(batch.status(), BatchStatus::PartialSuccess);
    let messages: Vec<_> =
        batch.results().iter().map(|result| result.error_message.as_deref()).collect();
    assert_eq!(
        messages,
        vec![None, Some("batch deadline exceeded"), Some("batch deadline exceeded")]
    );
    assert_eq!(messaging.calls(), 2);
}

/// Validates executor wiring from a configuration document.
#[tokio::test]
async fn test_from_config_uses_topic_prefix_and_rules() {
    let config: AssistantConfig = serde_json::from_value(json!({
        "hub": { "topic_prefix": "home/" },
        "approval": { "rules": [{ "device_id": "lamp", "action": "onoff" }] },
        "devices": [{ "id": "lamp", "capabilities": ["onoff"] }]
    }))
    .expect("parse config");
    let messaging = Arc::new(MockDeviceMessaging::new());
    messaging.set_status("home/lamp/status", json!({ "onoff": true }));
    let executor = ActionExecutor::from_config(Arc::clone(&messaging) as _, &config);

    let batch = executor
        .process(&[ActionRequest::new("lamp", "onoff", true)], true)
        .await
        .expect("batch processed");
    let status = executor.query_device_status("lamp").await.expect("status");

    assert_eq!(batch.status(), BatchStatus::Success);
    assert_eq!(messaging.published_topics(), vec!["home/lamp/onoff/set".to_string()]);
    assert_eq!(status, json!({ "onoff": true }));
}
