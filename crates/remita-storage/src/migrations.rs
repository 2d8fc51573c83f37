//! Database schema migrations.
//!
//! Applies the initial schema: agent_contexts, payments,
//! invoice_allocations, and the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use remita_core::error::RemitaError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental
/// changes.
pub fn run_migrations(conn: &mut Connection) -> Result<(), RemitaError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| RemitaError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| RemitaError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), RemitaError> {
    conn.execute_batch(
        "
        -- One row per processed document; the typed context is stored as a
        -- JSON blob in a single column.
        CREATE TABLE IF NOT EXISTS agent_contexts (
            document_id     TEXT PRIMARY KEY NOT NULL,
            customer_id     TEXT NOT NULL DEFAULT '',
            context_json    TEXT NOT NULL,
            updated_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_agent_contexts_customer
            ON agent_contexts (customer_id);

        -- Payment header rows. Amounts are canonical decimal strings.
        CREATE TABLE IF NOT EXISTS payments (
            payment_reference   TEXT PRIMARY KEY NOT NULL,
            customer_id         TEXT NOT NULL,
            payment_date        TEXT NOT NULL,
            payment_method      TEXT NOT NULL DEFAULT '',
            total_payment       TEXT NOT NULL,
            invoice_count       INTEGER NOT NULL,
            created_at          INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_payments_customer
            ON payments (customer_id);

        -- One allocation row per invoice the payment was applied against.
        CREATE TABLE IF NOT EXISTS invoice_allocations (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            payment_reference   TEXT NOT NULL
                                REFERENCES payments(payment_reference)
                                ON DELETE CASCADE,
            invoice_number      TEXT NOT NULL,
            invoice_amount      TEXT NOT NULL,
            amount_paid         TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_allocations_payment
            ON invoice_allocations (payment_reference);

        -- Record migration.
        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| RemitaError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
