//! Integration tests for the breaker-guarded messaging client
//!
//! Drives [`MessagingClient`] against the in-process [`LoopbackHub`]:
//! retry absorbing transient faults, per-category breaker isolation,
//! auto-reconnect and subscription delivery.

use std::sync::Arc;
use std::time::Duration;

use homevoice_common::resilience::{BreakerRegistry, CircuitState, NoOpObserver};
use homevoice_core::{MessageHandler, MessagingError, TransportError};
use homevoice_domain::BreakersConfig;
use homevoice_infra::messaging::{registry_from_config, HubOperation, LoopbackHub};
use homevoice_infra::MessagingClient;
use parking_lot::Mutex;
use serde_json::{json, Value};

fn client(hub: &Arc<LoopbackHub>, auto_reconnect: bool) -> (MessagingClient, BreakerRegistry) {
    let registry = registry_from_config(&BreakersConfig::default(), Arc::new(NoOpObserver))
        .expect("default breaker config is valid");
    let client = MessagingClient::new(hub.clone(), &registry)
        .expect("messaging breakers")
        .with_auto_reconnect(auto_reconnect);
    (client, registry)
}

fn state_of(registry: &BreakerRegistry, name: &str) -> CircuitState {
    registry.get(name).expect("breaker exists").state()
}

/// Validates a transient publish failure is retried away.
///
/// # Test Steps
/// 1. Inject two connection failures on publish
/// 2. Publish once
/// 3. Verify three hub calls, one recorded message, breaker still closed
#[tokio::test(start_paused = true)]
async fn test_transient_publish_fault_is_absorbed() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, registry) = client(&hub, true);
    client.connect().await.expect("connect");
    hub.fail_next(HubOperation::Publish, 2, TransportError::connection("reset by peer"));

    client.publish("homey/lamp/onoff/set", &json!({ "value": true })).await.expect("publish");

    assert_eq!(hub.calls(HubOperation::Publish), 3);
    assert_eq!(hub.published().len(), 1);
    assert_eq!(state_of(&registry, "publish"), CircuitState::Closed);
}

/// Validates a failing publish path trips only the `publish` breaker.
///
/// # Test Steps
/// 1. Make every publish fail with a connection error
/// 2. Verify the first publish exhausts four attempts and opens the breaker
/// 3. Verify the next publish is rejected without reaching the hub
/// 4. Verify status queries keep working through their own breaker
#[tokio::test(start_paused = true)]
async fn test_publish_outage_leaves_status_queries_working() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, registry) = client(&hub, true);
    client.connect().await.expect("connect");
    hub.set_status("homey/lamp/status", json!({ "onoff": false }));
    hub.fail_always(HubOperation::Publish, TransportError::connection("hub unreachable"));

    let first = client.publish("homey/lamp/onoff/set", &json!({ "value": true })).await;
    let Err(MessagingError::RetriesExhausted { breaker, attempts, .. }) = first else {
        panic!("expected exhausted retries, got {first:?}");
    };
    assert_eq!(breaker, "publish");
    assert_eq!(attempts, 4);

    let second = client.publish("homey/lamp/onoff/set", &json!({ "value": true })).await;
    assert!(second.is_err_and(|error| error.is_circuit_open()));
    assert_eq!(hub.calls(HubOperation::Publish), 4);

    let status = client.query_status("homey/lamp/status").await.expect("status query");
    assert_eq!(status, json!({ "onoff": false }));

    assert_eq!(state_of(&registry, "publish"), CircuitState::Open);
    assert_eq!(state_of(&registry, "query_status"), CircuitState::Closed);
    assert_eq!(state_of(&registry, "subscribe"), CircuitState::Closed);
}

/// Validates the client connects on demand and recovers a dropped link.
///
/// # Test Steps
/// 1. Publish without calling `connect`
/// 2. Drop the hub connection behind the client's back
/// 3. Query status and verify the retry reconnected
#[tokio::test(start_paused = true)]
async fn test_auto_reconnect_recovers_dropped_connection() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, registry) = client(&hub, true);

    client.publish("homey/lamp/onoff/set", &json!({ "value": true })).await.expect("publish");
    assert!(client.is_connected());
    assert_eq!(hub.connects(), 1);

    hub.drop_connection();
    let status = client.query_status("homey/lamp/status").await.expect("status after reconnect");

    assert_eq!(status, json!({ "onoff": true }));
    assert_eq!(hub.connects(), 2);
    assert_eq!(hub.calls(HubOperation::QueryStatus), 2);
    assert_eq!(state_of(&registry, "query_status"), CircuitState::Closed);
}

/// Validates a failed reconnect is itself retried.
#[tokio::test(start_paused = true)]
async fn test_failed_reconnect_is_retried() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, _registry) = client(&hub, true);
    hub.fail_next(HubOperation::Connect, 1, TransportError::connection("refused"));

    client.publish("homey/lamp/onoff/set", &json!({ "value": true })).await.expect("publish");

    assert_eq!(hub.calls(HubOperation::Connect), 2);
    assert_eq!(hub.calls(HubOperation::Publish), 1);
}

/// Validates concurrent operations on a disconnected client share one reconnect.
///
/// # Test Steps
/// 1. Slow the hub down so reconnect attempts overlap
/// 2. Spawn five publishes on a client that never connected
/// 3. Verify every publish succeeded over a single hub connection
#[tokio::test(start_paused = true)]
async fn test_concurrent_operations_reconnect_once() {
    let hub = Arc::new(LoopbackHub::new());
    hub.set_latency(Some(Duration::from_millis(10)));
    let (client, _registry) = client(&hub, true);
    let client = Arc::new(client);

    let handles: Vec<_> = (0..5)
        .map(|index| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let topic = format!("homey/lamp_{index}/onoff/set");
                client.publish(&topic, &json!({ "value": true })).await
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("task completes").expect("publish");
    }

    assert_eq!(hub.calls(HubOperation::Connect), 1);
    assert_eq!(hub.connects(), 1);
    assert_eq!(hub.published().len(), 5);
    assert!(client.is_connected());
}

/// Validates operations fail fast while disconnected without auto-reconnect.
///
/// # Test Steps
/// 1. Build a client with auto-reconnect disabled
/// 2. Verify publish reports `NotConnected` without touching the hub
/// 3. Connect explicitly and verify publish succeeds
#[tokio::test(start_paused = true)]
async fn test_disconnected_without_auto_reconnect() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, registry) = client(&hub, false);

    let result = client.publish("homey/lamp/onoff/set", &json!({ "value": true })).await;

    assert!(matches!(
        result,
        Err(MessagingError::Transport { source: TransportError::NotConnected, .. })
    ));
    assert_eq!(hub.calls(HubOperation::Publish), 0);
    assert_eq!(hub.connects(), 0);
    assert_eq!(registry.get("publish").expect("breaker").metrics().failures, 0);

    client.connect().await.expect("connect");
    client.publish("homey/lamp/onoff/set", &json!({ "value": true })).await.expect("publish");
    assert_eq!(hub.published().len(), 1);
}

/// Validates subscribers receive matching publishes and status reflects commands.
///
/// # Test Steps
/// 1. Subscribe a recording handler to `homey/#`
/// 2. Publish a command
/// 3. Verify the handler saw it and the status topic was updated
#[tokio::test]
async fn test_subscription_receives_published_commands() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, _registry) = client(&hub, true);
    client.connect().await.expect("connect");

    let received: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let handler: MessageHandler = Arc::new(move |topic: &str, payload: &Value| {
        sink.lock().push((topic.to_string(), payload.clone()));
    });
    client.subscribe("homey/#", handler).await.expect("subscribe");

    client.publish("homey/lamp/dim/set", &json!({ "value": 0.4 })).await.expect("publish");

    assert_eq!(hub.subscription_count(), 1);
    assert_eq!(
        received.lock().clone(),
        vec![("homey/lamp/dim/set".to_string(), json!({ "value": 0.4 }))]
    );
    let status = client.query_status("homey/lamp/status").await.expect("status query");
    assert_eq!(status, json!({ "dim": 0.4 }));
}

/// Validates non-retryable transport errors are surfaced after one attempt.
#[tokio::test]
async fn test_malformed_subscription_is_not_retried() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, registry) = client(&hub, true);
    client.connect().await.expect("connect");
    let handler: MessageHandler = Arc::new(|_: &str, _: &Value| {});

    let result = client.subscribe("", handler).await;

    assert!(matches!(
        result,
        Err(MessagingError::Transport { source: TransportError::Malformed(_), .. })
    ));
    assert_eq!(hub.calls(HubOperation::Subscribe), 1);
    assert_eq!(state_of(&registry, "subscribe"), CircuitState::Closed);
}

/// Validates connect and disconnect are idempotent.
#[tokio::test]
async fn test_connection_lifecycle_is_idempotent() {
    let hub = Arc::new(LoopbackHub::new());
    let (client, _registry) = client(&hub, true);

    client.connect().await.expect("connect");
    client.connect().await.expect("second connect");
    assert_eq!(hub.calls(HubOperation::Connect), 1);
    assert!(hub.is_connected());

    client.disconnect().await.expect("disconnect");
    client.disconnect().await.expect("second disconnect");
    assert!(!client.is_connected());
    assert!(!hub.is_connected());
    assert_eq!(client.breaker_metrics().len(), 3);
}
