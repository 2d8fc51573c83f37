//! Error types for context management.

use remita_core::error::RemitaError;

/// Errors from context lifecycle and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Invalid phase transition: {0} -> {1}")]
    InvalidTransition(String, String),
    #[error("Context serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] RemitaError),
}
