//! Remita ledger crate - remittance parsing and reconciliation analysis.
//!
//! Parses the financial header and invoice lines out of upstream document
//! content, persists payments with their allocations through the storage
//! repository, and analyzes whether a payment reconciles against its
//! allocations within a tolerance.

pub mod error;
pub mod remittance;
pub mod service;

pub use error::LedgerError;
pub use remittance::{InvoiceDetail, RemittanceFields};
pub use service::{InvoiceFinding, LedgerService, ReconciliationResult, ReconciliationStatus};
