//! Auto-approval policy
//!
//! Decides whether a proposed action may run without asking the user. The
//! decision is a pure function of the static rule set.

use homevoice_domain::{ActionRequest, ApprovalConfig, ApprovalRule};

/// Static rule set mapping `(device, action)` pairs to auto-approval
#[derive(Debug, Clone, Default)]
pub struct ApprovalPolicy {
    rules: Vec<ApprovalRule>,
    always_require_confirmation: bool,
}

impl ApprovalPolicy {
    pub fn new(rules: Vec<ApprovalRule>) -> Self {
        Self { rules, always_require_confirmation: false }
    }

    pub fn from_config(config: &ApprovalConfig) -> Self {
        Self {
            rules: config.rules.clone(),
            always_require_confirmation: config.always_require_confirmation,
        }
    }

    /// Refuse auto-approval for everything, regardless of rules
    #[must_use]
    pub fn always_require_confirmation(mut self, enabled: bool) -> Self {
        self.always_require_confirmation = enabled;
        self
    }

    /// `true` when some rule matches both `device_id` and `action` exactly
    pub fn evaluate(&self, device_id: &str, action: &str) -> bool {
        !self.always_require_confirmation
            && self.rules.iter().any(|rule| rule.matches(device_id, action))
    }

    /// Whether a proposed request is auto-approved; incomplete requests never are
    pub fn approves(&self, request: &ActionRequest) -> bool {
        match (&request.device_id, &request.capability) {
            (Some(device), Some(capability)) => self.evaluate(device, capability),
            _ => false,
        }
    }

    /// Whether every request in the batch is auto-approved
    pub fn approves_all(&self, requests: &[ActionRequest]) -> bool {
        requests.iter().all(|request| self.approves(request))
    }

    pub fn rules(&self) -> &[ApprovalRule] {
        &self.rules
    }
}
