//! Remita storage crate - embedded SQLite persistence.
//!
//! Provides a WAL-mode SQLite database with migrations, the invoice/payment
//! ledger repository, and the agent-context row store. All access goes
//! through the `Database` wrapper; connections are never handed out raw.

pub mod contexts;
pub mod db;
pub mod ledger;
pub mod migrations;

pub use contexts::{ContextRepository, StoredContext};
pub use db::Database;
pub use ledger::{AllocationRecord, LedgerRepository, PaymentRecord};
