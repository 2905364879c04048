//! Device catalogue

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A controllable device known to the hub
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Capabilities the device accepts; empty means any
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), zone: None, capabilities: Vec::new() }
    }

    #[must_use]
    pub fn in_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    #[must_use]
    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.is_empty() || self.capabilities.iter().any(|c| c == capability)
    }
}

/// Lookup table of configured devices keyed by id
///
/// An empty catalogue places no restriction on device ids.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalogue {
    devices: HashMap<String, DeviceDescriptor>,
}

impl DeviceCatalogue {
    pub fn new(devices: impl IntoIterator<Item = DeviceDescriptor>) -> Self {
        Self { devices: devices.into_iter().map(|device| (device.id.clone(), device)).collect() }
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceDescriptor> {
        self.devices.get(device_id)
    }

    /// Whether `device_id` may be addressed at all
    pub fn accepts(&self, device_id: &str) -> bool {
        self.devices.is_empty() || self.devices.contains_key(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices in `zone`, sorted by id
    pub fn in_zone(&self, zone: &str) -> Vec<&DeviceDescriptor> {
        let mut devices: Vec<_> =
            self.devices.values().filter(|device| device.zone.as_deref() == Some(zone)).collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }
}
