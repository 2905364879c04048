//! Aggregated outcome of one batch of device actions
//!
//! A [`BatchResult`] can only be built through [`BatchResult::from_results`]
//! or [`BatchResult::pending_confirmation`], so its status always agrees
//! with its results:
//! - `success`: every result succeeded
//! - `partial_success`: some, but not all, results succeeded
//! - `failed`: at least one result, none succeeded
//! - `pending_confirmation`: no results, nothing was attempted

use std::fmt;

use serde::{Deserialize, Serialize};

use super::action::ActionResult;

/// Overall status of a processed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    PartialSuccess,
    Failed,
    PendingConfirmation,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::PendingConfirmation => "pending_confirmation",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus per-action results, in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBatchResult")]
pub struct BatchResult {
    status: BatchStatus,
    results: Vec<ActionResult>,
}

impl BatchResult {
    /// Aggregate attempted actions; `None` when nothing was attempted
    pub fn from_results(results: Vec<ActionResult>) -> Option<Self> {
        let status = Self::status_for(&results)?;
        Some(Self { status, results })
    }

    /// Batch held back for explicit confirmation; carries no results
    pub fn pending_confirmation() -> Self {
        Self { status: BatchStatus::PendingConfirmation, results: Vec::new() }
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn results(&self) -> &[ActionResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ActionResult> {
        self.results
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|result| result.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    pub fn is_pending_confirmation(&self) -> bool {
        self.status == BatchStatus::PendingConfirmation
    }

    fn status_for(results: &[ActionResult]) -> Option<BatchStatus> {
        if results.is_empty() {
            return None;
        }
        let successes = results.iter().filter(|result| result.is_success()).count();
        Some(match successes {
            0 => BatchStatus::Failed,
            n if n == results.len() => BatchStatus::Success,
            _ => BatchStatus::PartialSuccess,
        })
    }
}

#[derive(Deserialize)]
struct RawBatchResult {
    status: BatchStatus,
    #[serde(default)]
    results: Vec<ActionResult>,
}

impl TryFrom<RawBatchResult> for BatchResult {
    type Error = String;

    fn try_from(raw: RawBatchResult) -> Result<Self, Self::Error> {
        let expected =
            Self::status_for(&raw.results).unwrap_or(BatchStatus::PendingConfirmation);
        if raw.status != expected {
            return Err(format!(
                "batch status {} does not match its results (expected {expected})",
                raw.status
            ));
        }
        Ok(Self { status: raw.status, results: raw.results })
    }
}
