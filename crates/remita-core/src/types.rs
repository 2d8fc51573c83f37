use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Enums
// =============================================================================

/// Upstream work-item status vocabulary.
///
/// The document-intelligence system reports statuses as human-readable
/// strings ("Validation Completed"). Unknown statuses are preserved through
/// the `Other` variant instead of failing parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkItemStatus {
    ValidationCompleted,
    ReconciliationCompleted,
    Failed,
    Other(String),
}

impl WorkItemStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkItemStatus::ValidationCompleted => "Validation Completed",
            WorkItemStatus::ReconciliationCompleted => "Reconciliation Completed",
            WorkItemStatus::Failed => "Failed",
            WorkItemStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for WorkItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for WorkItemStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Validation Completed" => WorkItemStatus::ValidationCompleted,
            "Reconciliation Completed" => WorkItemStatus::ReconciliationCompleted,
            "Failed" => WorkItemStatus::Failed,
            _ => WorkItemStatus::Other(s),
        }
    }
}

impl From<WorkItemStatus> for String {
    fn from(status: WorkItemStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Technical outcome vocabulary for completing an upstream work-item stage.
///
/// Business outcomes (reconciled / discrepancy found) are mapped onto this
/// pair before the write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageOutcome {
    Success,
    Failure,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageOutcome::Success => "SUCCESS",
            StageOutcome::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageOutcome {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(StageOutcome::Success),
            "FAILURE" => Ok(StageOutcome::Failure),
            _ => Err(format!("Unknown stage outcome: {}", s)),
        }
    }
}
