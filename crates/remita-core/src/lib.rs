//! Remita core crate - shared errors, configuration, money arithmetic.
//!
//! Every other Remita crate depends on this one for the top-level error
//! type, the TOML configuration model, currency-safe decimal arithmetic,
//! and the upstream status vocabulary.

pub mod config;
pub mod error;
pub mod money;
pub mod types;

pub use config::RemitaConfig;
pub use error::{RemitaError, Result};
pub use types::{StageOutcome, WorkItemStatus};
