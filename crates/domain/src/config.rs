//! Configuration management
//!
//! Every section has serde defaults, so a configuration file only needs to
//! mention what it changes.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    COMMAND_TOPIC_SUFFIX, DEFAULT_CLIENT_ID, DEFAULT_HUB_HOST, DEFAULT_HUB_PORT,
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_KEEPALIVE_SECS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_BACKOFF_MS,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_ELAPSED_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_OPEN_TIMEOUT_SECS, DEFAULT_SUCCESS_THRESHOLD, DEFAULT_TOPIC_PREFIX,
    STATUS_TOPIC_SUFFIX,
};
use crate::errors::{HomeVoiceError, Result};
use crate::types::{ApprovalRule, DeviceCatalogue, DeviceDescriptor};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub hub: HubConfig,
    pub breakers: BreakersConfig,
    pub approval: ApprovalConfig,
    pub devices: Vec<DeviceDescriptor>,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
}

impl AssistantConfig {
    /// Check cross-field constraints serde cannot express
    ///
    /// # Errors
    /// Returns `HomeVoiceError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.hub.host.trim().is_empty() {
            return Err(config_error("hub.host must not be empty"));
        }
        if self.hub.port == 0 {
            return Err(config_error("hub.port must be non-zero"));
        }
        if self.execution.max_concurrency == 0 {
            return Err(config_error("execution.max_concurrency must be at least 1"));
        }
        if self.execution.deadline_ms == Some(0) {
            return Err(config_error("execution.deadline_ms must be positive when set"));
        }

        self.breakers.defaults.validate("breakers.defaults")?;
        for name in self.breakers.overrides.keys() {
            self.breakers.settings_for(name).validate(&format!("breakers.overrides.{name}"))?;
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            if device.id.is_empty() {
                return Err(config_error("devices: device id must not be empty"));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(config_error(format!("devices: duplicate device id '{}'", device.id)));
            }
        }
        Ok(())
    }

    /// Device catalogue built from the `devices` section
    pub fn catalogue(&self) -> DeviceCatalogue {
        DeviceCatalogue::new(self.devices.iter().cloned())
    }
}

fn config_error(message: impl Into<String>) -> HomeVoiceError {
    HomeVoiceError::Config(message.into())
}

/* -------------------------------------------------------------------------- */
/* Hub */
/* -------------------------------------------------------------------------- */

/// Hub connection and topic layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    pub keepalive_seconds: u64,
    pub client_id: String,
    pub topic_prefix: String,
    /// Connect on demand when an operation finds the client disconnected
    pub auto_reconnect: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HUB_HOST.to_string(),
            port: DEFAULT_HUB_PORT,
            keepalive_seconds: DEFAULT_KEEPALIVE_SECS,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            auto_reconnect: true,
        }
    }
}

impl HubConfig {
    /// `{prefix}{device}/{capability}/set`
    pub fn command_topic(&self, device_id: &str, capability: &str) -> String {
        format!("{}{device_id}/{capability}/{COMMAND_TOPIC_SUFFIX}", self.topic_prefix)
    }

    /// `{prefix}{device}/status`
    pub fn status_topic(&self, device_id: &str) -> String {
        format!("{}{device_id}/{STATUS_TOPIC_SUFFIX}", self.topic_prefix)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_seconds)
    }
}

/* -------------------------------------------------------------------------- */
/* Circuit Breakers */
/* -------------------------------------------------------------------------- */

/// Circuit breaker and retry settings for one messaging category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub open_timeout_seconds: u64,
    pub success_threshold: u32,
    pub max_retries: u32,
    pub max_elapsed_ms: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            open_timeout_seconds: DEFAULT_OPEN_TIMEOUT_SECS,
            success_threshold: DEFAULT_SUCCESS_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            max_elapsed_ms: DEFAULT_MAX_ELAPSED_MS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl BreakerSettings {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_secs(self.open_timeout_seconds)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    fn validate(&self, section: &str) -> Result<()> {
        if self.success_threshold == 0 {
            return Err(config_error(format!("{section}.success_threshold must be at least 1")));
        }
        if self.max_elapsed_ms == 0 {
            return Err(config_error(format!("{section}.max_elapsed_ms must be positive")));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(config_error(format!(
                "{section}.initial_backoff_ms must not exceed max_backoff_ms"
            )));
        }
        Ok(())
    }
}

/// Partial settings layered over [`BreakersConfig::defaults`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_backoff_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms: Option<u64>,
}

impl BreakerOverride {
    fn apply(&self, base: &BreakerSettings) -> BreakerSettings {
        BreakerSettings {
            open_timeout_seconds: self.open_timeout_seconds.unwrap_or(base.open_timeout_seconds),
            success_threshold: self.success_threshold.unwrap_or(base.success_threshold),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            max_elapsed_ms: self.max_elapsed_ms.unwrap_or(base.max_elapsed_ms),
            initial_backoff_ms: self.initial_backoff_ms.unwrap_or(base.initial_backoff_ms),
            max_backoff_ms: self.max_backoff_ms.unwrap_or(base.max_backoff_ms),
        }
    }
}

/// Breaker defaults plus per-category overrides keyed by breaker name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakersConfig {
    pub defaults: BreakerSettings,
    pub overrides: BTreeMap<String, BreakerOverride>,
}

impl BreakersConfig {
    /// Effective settings for the breaker called `name`
    pub fn settings_for(&self, name: &str) -> BreakerSettings {
        match self.overrides.get(name) {
            Some(overrides) => overrides.apply(&self.defaults),
            None => self.defaults.clone(),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Approval, Execution, Logging */
/* -------------------------------------------------------------------------- */

/// Auto-approval rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Require confirmation for every action regardless of rules
    pub always_require_confirmation: bool,
    pub rules: Vec<ApprovalRule>,
}

/// Batch execution limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_concurrency: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { max_concurrency: DEFAULT_MAX_CONCURRENCY, deadline_ms: None }
    }
}

impl ExecutionConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `homevoice_infra=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}
