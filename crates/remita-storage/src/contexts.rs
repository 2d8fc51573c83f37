//! Agent-context row store.
//!
//! Persists the JSON-serialized processing context for each document, one
//! row per document_id. The typed context lives in remita-context; this
//! module only moves the blob in and out of SQLite.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use tracing::error;

use remita_core::error::RemitaError;

use crate::db::Database;

/// A raw persisted context row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContext {
    pub document_id: String,
    pub customer_id: String,
    pub context_json: String,
}

/// Repository for agent-context rows.
pub struct ContextRepository {
    db: Arc<Database>,
}

impl ContextRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Upsert the context blob for a document.
    ///
    /// Concurrent writers to the same document_id resolve last-writer-wins
    /// through the ON CONFLICT clause; there is no optimistic version check.
    pub fn upsert(
        &self,
        document_id: &str,
        customer_id: &str,
        context_json: &str,
    ) -> Result<(), RemitaError> {
        self.db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO agent_contexts (document_id, customer_id, context_json, updated_at)
                     VALUES (?1, ?2, ?3, strftime('%s', 'now'))
                     ON CONFLICT(document_id) DO UPDATE SET
                         customer_id = excluded.customer_id,
                         context_json = excluded.context_json,
                         updated_at = excluded.updated_at",
                    rusqlite::params![document_id, customer_id, context_json],
                )
                .map_err(|e| RemitaError::Storage(format!("Failed to upsert context: {}", e)))?;
                Ok(())
            })
            .inspect_err(|e| {
                error!(document_id, error = %e, "Context upsert failed");
            })
    }

    /// Point lookup of the context blob by document_id.
    ///
    /// Returns `None` when no context has been stored yet; the caller then
    /// constructs a fresh context.
    pub fn select(&self, document_id: &str) -> Result<Option<StoredContext>, RemitaError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT document_id, customer_id, context_json
                 FROM agent_contexts WHERE document_id = ?1",
                rusqlite::params![document_id],
                |row| {
                    Ok(StoredContext {
                        document_id: row.get(0)?,
                        customer_id: row.get(1)?,
                        context_json: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| RemitaError::Storage(format!("Failed to load context: {}", e)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> ContextRepository {
        ContextRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_upsert_and_select() {
        let repo = test_repo();
        repo.upsert("DOC-1", "CUST-1", r#"{"phase":"payment_data_loading"}"#)
            .unwrap();

        let stored = repo.select("DOC-1").unwrap().unwrap();
        assert_eq!(stored.document_id, "DOC-1");
        assert_eq!(stored.customer_id, "CUST-1");
        assert_eq!(stored.context_json, r#"{"phase":"payment_data_loading"}"#);
    }

    #[test]
    fn test_select_missing_returns_none() {
        let repo = test_repo();
        assert!(repo.select("DOC-404").unwrap().is_none());
    }

    #[test]
    fn test_upsert_overwrites_last_writer_wins() {
        let repo = test_repo();
        repo.upsert("DOC-1", "CUST-1", "{\"v\":1}").unwrap();
        repo.upsert("DOC-1", "CUST-2", "{\"v\":2}").unwrap();

        let stored = repo.select("DOC-1").unwrap().unwrap();
        assert_eq!(stored.customer_id, "CUST-2");
        assert_eq!(stored.context_json, "{\"v\":2}");
    }

    #[test]
    fn test_contexts_are_isolated_per_document() {
        let repo = test_repo();
        repo.upsert("DOC-1", "CUST-1", "{\"v\":1}").unwrap();
        repo.upsert("DOC-2", "CUST-1", "{\"v\":2}").unwrap();

        assert_eq!(repo.select("DOC-1").unwrap().unwrap().context_json, "{\"v\":1}");
        assert_eq!(repo.select("DOC-2").unwrap().unwrap().context_json, "{\"v\":2}");
    }
}
