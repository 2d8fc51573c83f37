//! Remita context crate - phase-scoped processing context.
//!
//! Tracks a document's journey through the reconciliation phases: each
//! phase records start/end time, a timestamped event log, and metrics. The
//! whole context is persisted as a JSON blob keyed by document_id and can
//! be loaded back for resumption.

pub mod context;
pub mod error;
pub mod manager;
pub mod phase;

pub use context::{InsightContext, PhaseContext, PhaseEvent};
pub use error::ContextError;
pub use manager::ContextManager;
pub use phase::{validate_transition, ReconciliationPhase};
