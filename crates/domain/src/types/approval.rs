//! Auto-approval rules

use serde::{Deserialize, Serialize};

/// Allows one action on one device to run without explicit confirmation
///
/// Both fields are matched by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalRule {
    #[serde(alias = "device")]
    pub device_id: String,
    pub action: String,
}

impl ApprovalRule {
    pub fn new(device_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self { device_id: device_id.into(), action: action.into() }
    }

    pub fn matches(&self, device_id: &str, action: &str) -> bool {
        self.device_id == device_id && self.action == action
    }
}
