//! Error taxonomy for action execution.
//!
//! Internal code returns these typed errors; the action boundary converts
//! every one of them into a structured failure response.

use remita_context::ContextError;
use remita_core::error::RemitaError;
use remita_ledger::LedgerError;

/// Errors raised while executing an action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The upstream work item is not in the state this action expects.
    /// Never retried.
    #[error("Upstream state error: {0}")]
    UpstreamState(String),
    /// Bad input caught before any side effect.
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
    #[error(transparent)]
    Core(#[from] RemitaError),
}

impl ActionError {
    /// Stable identifier of the error class, carried in `additional_data`.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::UpstreamState(_) => "upstream_state",
            ActionError::Validation(_) => "validation",
            ActionError::Ledger(_) => "ledger",
            ActionError::Context(_) => "context",
            ActionError::Core(_) => "core",
        }
    }
}
