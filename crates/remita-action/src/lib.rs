//! Remita action crate - orchestration entry points.
//!
//! The actions are plain async functions on `ReconciliationActions` with
//! typed parameters and a typed `ActionResponse`; they compose the context
//! manager, the ledger service, and the document-intelligence client. No
//! error escapes an action as a raw exception: every failure path returns a
//! structured failure response.

pub mod actions;
pub mod docintel;
pub mod error;
pub mod response;
pub mod retry;

pub use actions::{ReconciliationActions, PURGE_CONFIRMATION};
pub use docintel::{
    DocumentIntelligenceClient, HttpDocIntelClient, MockDocIntelClient, StageCompletion, WorkItem,
};
pub use error::ActionError;
pub use response::{ActionResponse, ActionStatus};
