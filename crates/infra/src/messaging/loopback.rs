//! In-process hub transport
//!
//! [`LoopbackHub`] stands in for the home-automation hub during development
//! and tests. It records every publish, delivers messages to matching
//! subscribers, serves status topics and can inject failures or latency
//! per operation.
//!
//! Publishing a command on `<device path>/<capability>/set` also updates
//! `<device path>/status`, so status queries reflect the last command the
//! way a real hub would after the device reports back.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use homevoice_core::{HubTransport, MessageHandler, TransportError};
use homevoice_domain::constants::{COMMAND_TOPIC_SUFFIX, STATUS_TOPIC_SUFFIX};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::debug;

/// Transport operation a fault can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubOperation {
    Connect,
    Publish,
    Subscribe,
    QueryStatus,
}

/// A message accepted by the hub
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Value,
}

#[derive(Debug, Clone)]
struct Fault {
    error: TransportError,
    /// Remaining failures; `None` fails forever
    remaining: Option<u32>,
}

#[derive(Default)]
struct HubState {
    connected: bool,
    connects: u32,
    published: Vec<PublishedMessage>,
    subscriptions: Vec<(String, MessageHandler)>,
    statuses: HashMap<String, Value>,
    faults: HashMap<HubOperation, Fault>,
    calls: HashMap<HubOperation, u32>,
}

/// In-memory [`HubTransport`] with fault injection
#[derive(Default)]
pub struct LoopbackHub {
    state: Mutex<HubState>,
    latency: Mutex<Option<Duration>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls of `operation` with `error`
    pub fn fail_next(&self, operation: HubOperation, times: u32, error: TransportError) {
        let mut state = self.state.lock();
        if times == 0 {
            state.faults.remove(&operation);
        } else {
            state.faults.insert(operation, Fault { error, remaining: Some(times) });
        }
    }

    /// Fail every call of `operation` with `error` until cleared
    pub fn fail_always(&self, operation: HubOperation, error: TransportError) {
        self.state.lock().faults.insert(operation, Fault { error, remaining: None });
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Delay every operation by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Seed the value served for a status topic
    pub fn set_status(&self, topic: impl Into<String>, value: Value) {
        self.state.lock().statuses.insert(topic.into(), value);
    }

    /// Simulate the hub dropping the connection
    pub fn drop_connection(&self) {
        self.state.lock().connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Successful connects so far
    pub fn connects(&self) -> u32 {
        self.state.lock().connects
    }

    /// Calls of `operation` so far, including injected failures
    pub fn calls(&self, operation: HubOperation) -> u32 {
        self.state.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().published.clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Count the call, apply latency, then fire any injected fault
    async fn begin(&self, operation: HubOperation) -> Result<(), TransportError> {
        *self.state.lock().calls.entry(operation).or_insert(0) += 1;

        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock();
        let Some(fault) = state.faults.get_mut(&operation) else {
            return Ok(());
        };
        let error = fault.error.clone();
        let exhausted = match fault.remaining.as_mut() {
            None => false,
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
        };
        if exhausted {
            state.faults.remove(&operation);
        }
        debug!(?operation, error = %error, "injecting transport fault");
        Err(error)
    }

    fn require_connected(&self) -> Result<(), TransportError> {
        if self.state.lock().connected {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

#[async_trait]
impl HubTransport for LoopbackHub {
    async fn connect(&self) -> Result<(), TransportError> {
        self.begin(HubOperation::Connect).await?;
        let mut state = self.state.lock();
        if !state.connected {
            state.connected = true;
            state.connects += 1;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.state.lock().connected = false;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), TransportError> {
        self.begin(HubOperation::Publish).await?;
        self.require_connected()?;
        if topic.is_empty() || topic.contains(['+', '#']) {
            return Err(TransportError::malformed(format!("invalid publish topic '{topic}'")));
        }

        let handlers: Vec<MessageHandler> = {
            let mut state = self.state.lock();
            state
                .published
                .push(PublishedMessage { topic: topic.to_string(), payload: payload.clone() });
            if let Some((status_topic, capability)) = command_target(topic) {
                let value = payload.get("value").cloned().unwrap_or_else(|| payload.clone());
                let entry =
                    state.statuses.entry(status_topic).or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(fields) = entry {
                    fields.insert(capability.to_string(), value);
                }
            }
            state
                .subscriptions
                .iter()
                .filter(|(filter, _)| topic_matches(filter, topic))
                .map(|(_, handler)| handler.clone())
                .collect()
        };

        for handler in handlers {
            handler(topic, payload);
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), TransportError> {
        self.begin(HubOperation::Subscribe).await?;
        self.require_connected()?;
        if topic.is_empty() {
            return Err(TransportError::malformed("empty subscription topic"));
        }
        self.state.lock().subscriptions.push((topic.to_string(), handler));
        Ok(())
    }

    async fn query_status(&self, topic: &str) -> Result<Value, TransportError> {
        self.begin(HubOperation::QueryStatus).await?;
        self.require_connected()?;
        self.state
            .lock()
            .statuses
            .get(topic)
            .cloned()
            .ok_or_else(|| TransportError::rejected(format!("no status published on '{topic}'")))
    }
}

/// Split `<device path>/<capability>/set` into its status topic and capability
fn command_target(topic: &str) -> Option<(String, &str)> {
    let device_and_capability = topic.strip_suffix(COMMAND_TOPIC_SUFFIX)?.strip_suffix('/')?;
    let (device_path, capability) = device_and_capability.rsplit_once('/')?;
    if device_path.is_empty() || capability.is_empty() {
        return None;
    }
    Some((format!("{device_path}/{STATUS_TOPIC_SUFFIX}"), capability))
}

/// MQTT-style topic filter matching (`+` one level, trailing `#` the rest)
fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
