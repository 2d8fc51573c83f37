//! Error types for the ledger service.

use remita_core::error::RemitaError;

/// Errors from remittance parsing, storage, and analysis.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },
    #[error("Invoice count mismatch: header says {expected}, found {actual} detail rows")]
    InvoiceCountMismatch { expected: usize, actual: usize },
    #[error("Payment already stored: {0}")]
    DuplicatePayment(String),
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] RemitaError),
}
