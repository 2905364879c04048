//! Proposed device actions and their per-action outcomes
//!
//! Action plans arrive as loosely typed JSON, so every request field is
//! optional; completeness is checked when the batch is executed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single proposed change on one device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default, alias = "device")]
    pub device_id: Option<String>,

    #[serde(default, alias = "action")]
    pub capability: Option<String>,

    #[serde(default)]
    pub value: Option<Value>,
}

impl ActionRequest {
    pub fn new(
        device_id: impl Into<String>,
        capability: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            device_id: Some(device_id.into()),
            capability: Some(capability.into()),
            value: Some(value.into()),
        }
    }

    /// Borrow all three fields, or `None` if any of them is missing
    pub fn parts(&self) -> Option<(&str, &str, &Value)> {
        match (&self.device_id, &self.capability, &self.value) {
            (Some(device), Some(capability), Some(value)) => {
                Some((device.as_str(), capability.as_str(), value))
            }
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.parts().is_some()
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = self.device_id.as_deref().unwrap_or("?");
        let capability = self.capability.as_deref().unwrap_or("?");
        match &self.value {
            Some(value) => write!(f, "{device}.{capability} = {value}"),
            None => write!(f, "{device}.{capability}"),
        }
    }
}

/// Whether an attempted action took effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    Failed,
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one attempted action, echoing the request it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub device_id: Option<String>,
    pub capability: Option<String>,
    pub value: Option<Value>,
    pub outcome: ActionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ActionResult {
    pub fn success(request: &ActionRequest) -> Self {
        Self::from_request(request, ActionOutcome::Success, None)
    }

    pub fn failed(request: &ActionRequest, message: impl Into<String>) -> Self {
        Self::from_request(request, ActionOutcome::Failed, Some(message.into()))
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ActionOutcome::Success
    }

    fn from_request(
        request: &ActionRequest,
        outcome: ActionOutcome,
        error_message: Option<String>,
    ) -> Self {
        Self {
            device_id: request.device_id.clone(),
            capability: request.capability.clone(),
            value: request.value.clone(),
            outcome,
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    /// Validates `ActionRequest` deserialization for the upstream plan
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `device`/`action` aliases populate the canonical fields.
    /// - Confirms absent fields deserialize as `None`.
    #[test]
    fn test_request_accepts_plan_aliases() {
        let request: ActionRequest =
            serde_json::from_value(json!({ "device": "lamp", "action": "onoff", "value": true }))
                .expect("deserialize plan action");
        assert_eq!(request, ActionRequest::new("lamp", "onoff", true));

        let partial: ActionRequest =
            serde_json::from_value(json!({ "device_id": "lamp" })).expect("deserialize");
        assert_eq!(partial.capability, None);
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_parts_requires_every_field() {
        let request = ActionRequest::new("thermostat", "target_temperature", 21.5);
        let (device, capability, value) = request.parts().expect("complete request");
        assert_eq!(device, "thermostat");
        assert_eq!(capability, "target_temperature");
        assert_eq!(value, &json!(21.5));

        let missing_value = ActionRequest { value: None, ..request };
        assert!(missing_value.parts().is_none());
    }

    #[test]
    fn test_result_echoes_request() {
        let request = ActionRequest::new("lamp", "dim", 0.4);

        let ok = ActionResult::success(&request);
        let failed = ActionResult::failed(&request, "device unreachable");

        assert!(ok.is_success());
        assert_eq!(ok.device_id.as_deref(), Some("lamp"));
        assert_eq!(ok.error_message, None);
        assert!(!failed.is_success());
        assert_eq!(failed.error_message.as_deref(), Some("device unreachable"));
        assert_eq!(failed.value, Some(json!(0.4)));
    }

    #[test]
    fn test_result_serialization_omits_empty_error() {
        let json = serde_json::to_value(ActionResult::success(&ActionRequest::new(
            "lamp", "onoff", false,
        )))
        .expect("serialize result");

        assert_eq!(json["outcome"], "success");
        assert!(json.get("error_message").is_none());
    }

    #[test]
    fn test_display_marks_missing_fields() {
        assert_eq!(ActionRequest::new("lamp", "onoff", true).to_string(), "lamp.onoff = true");
        assert_eq!(ActionRequest::default().to_string(), "?.?");
    }
}
