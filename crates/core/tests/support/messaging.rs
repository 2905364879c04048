//! In-memory mock for the `DeviceMessaging` port

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use homevoice_core::{DeviceMessaging, MessagingError};
use parking_lot::Mutex;
use serde_json::Value;

/// Records publishes, fails or delays selected topics and tracks how many
/// calls were in flight at once.
#[derive(Default)]
pub struct MockDeviceMessaging {
    published: Mutex<Vec<(String, Value)>>,
    failures: Mutex<HashMap<String, MessagingError>>,
    delays: Mutex<HashMap<String, Duration>>,
    statuses: Mutex<HashMap<String, Value>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockDeviceMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call on `topic` with `error`
    pub fn fail_topic(&self, topic: &str, error: MessagingError) {
        self.failures.lock().insert(topic.to_string(), error);
    }

    /// Delay every call on `topic` by `delay`
    pub fn delay_topic(&self, topic: &str, delay: Duration) {
        self.delays.lock().insert(topic.to_string(), delay);
    }

    pub fn set_status(&self, topic: &str, value: Value) {
        self.statuses.lock().insert(topic.to_string(), value);
    }

    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().clone()
    }

    pub fn published_topics(&self) -> Vec<String> {
        self.published.lock().iter().map(|(topic, _)| topic.clone()).collect()
    }

    /// Every call made, successful or not
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, topic: &str) -> Result<(), MessagingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.delays.lock().get(topic).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.failures.lock().get(topic) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DeviceMessaging for MockDeviceMessaging {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<(), MessagingError> {
        self.enter(topic).await?;
        self.published.lock().push((topic.to_string(), payload.clone()));
        Ok(())
    }

    async fn query_status(&self, topic: &str) -> Result<Value, MessagingError> {
        self.enter(topic).await?;
        Ok(self.statuses.lock().get(topic).cloned().unwrap_or(Value::Null))
    }
}
