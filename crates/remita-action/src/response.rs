//! Typed action response contract.
//!
//! Every action returns an `ActionResponse`: a status enum, a human
//! message, an optional payload, and an optional `additional_data` object
//! used for error detail propagation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ActionError;

/// Outcome of an action invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Success,
    Failure,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Success => write!(f, "SUCCESS"),
            ActionStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Response returned by every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub status: ActionStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,
}

impl ActionResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            payload: None,
            additional_data: None,
        }
    }

    pub fn success_with_payload(message: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            status: ActionStatus::Success,
            message: message.into(),
            payload: Some(payload),
            additional_data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Failure,
            message: message.into(),
            payload: None,
            additional_data: None,
        }
    }

    /// Build a failure response from a typed error, carrying the error
    /// string and its class in `additional_data`.
    pub fn from_error(err: &ActionError) -> Self {
        Self {
            status: ActionStatus::Failure,
            message: err.to_string(),
            payload: None,
            additional_data: Some(serde_json::json!({
                "error": err.to_string(),
                "kind": err.kind(),
            })),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}
