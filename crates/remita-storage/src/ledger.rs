//! Invoice/payment ledger repository.
//!
//! Raw-SQL repository over the payments and invoice_allocations tables.
//! A payment and its allocation rows are written in one transaction; a
//! failure anywhere leaves no partial write behind.

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::OptionalExtension;

use remita_core::error::RemitaError;

use crate::db::Database;

/// A persisted payment header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub payment_reference: String,
    pub customer_id: String,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub total_payment: Decimal,
    pub invoice_count: usize,
}

/// A persisted invoice-allocation row belonging to a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRecord {
    pub payment_reference: String,
    pub invoice_number: String,
    pub invoice_amount: Decimal,
    pub amount_paid: Decimal,
}

/// Repository for payment and allocation rows.
pub struct LedgerRepository {
    db: Arc<Database>,
}

impl LedgerRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a payment and its allocation rows in a single transaction.
    ///
    /// All-or-nothing: if any insert fails the transaction rolls back and no
    /// rows are visible to later reads.
    pub fn insert_payment_with_allocations(
        &self,
        payment: &PaymentRecord,
        allocations: &[AllocationRecord],
    ) -> Result<(), RemitaError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| RemitaError::Storage(format!("Failed to begin transaction: {}", e)))?;

            tx.execute(
                "INSERT INTO payments
                     (payment_reference, customer_id, payment_date, payment_method,
                      total_payment, invoice_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    payment.payment_reference,
                    payment.customer_id,
                    payment.payment_date.to_string(),
                    payment.payment_method,
                    payment.total_payment.to_string(),
                    payment.invoice_count as i64,
                ],
            )
            .map_err(|e| RemitaError::Storage(format!("Failed to insert payment: {}", e)))?;

            for allocation in allocations {
                tx.execute(
                    "INSERT INTO invoice_allocations
                         (payment_reference, invoice_number, invoice_amount, amount_paid)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![
                        allocation.payment_reference,
                        allocation.invoice_number,
                        allocation.invoice_amount.to_string(),
                        allocation.amount_paid.to_string(),
                    ],
                )
                .map_err(|e| {
                    RemitaError::Storage(format!("Failed to insert allocation: {}", e))
                })?;
            }

            tx.commit()
                .map_err(|e| RemitaError::Storage(format!("Failed to commit payment: {}", e)))
        })
    }

    /// Point lookup of a payment by its reference.
    pub fn find_payment(&self, payment_reference: &str) -> Result<Option<PaymentRecord>, RemitaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT payment_reference, customer_id, payment_date, payment_method,
                            total_payment, invoice_count
                     FROM payments WHERE payment_reference = ?1",
                )
                .map_err(|e| RemitaError::Storage(e.to_string()))?;

            let result = stmt
                .query_row(rusqlite::params![payment_reference], |row| {
                    Ok(row_to_payment(row))
                })
                .optional()
                .map_err(|e| RemitaError::Storage(e.to_string()))?;

            match result {
                Some(payment) => Ok(Some(payment?)),
                None => Ok(None),
            }
        })
    }

    /// All allocation rows for a payment, in insertion order.
    pub fn allocations_for(
        &self,
        payment_reference: &str,
    ) -> Result<Vec<AllocationRecord>, RemitaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT payment_reference, invoice_number, invoice_amount, amount_paid
                     FROM invoice_allocations
                     WHERE payment_reference = ?1
                     ORDER BY id ASC",
                )
                .map_err(|e| RemitaError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![payment_reference], |row| {
                    Ok(row_to_allocation(row))
                })
                .map_err(|e| RemitaError::Storage(e.to_string()))?;

            let mut allocations = Vec::new();
            for row in rows {
                let allocation = row.map_err(|e| RemitaError::Storage(e.to_string()))??;
                allocations.push(allocation);
            }
            Ok(allocations)
        })
    }

    /// Count payment rows.
    pub fn payment_count(&self) -> Result<u64, RemitaError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))
                .map_err(|e| RemitaError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    /// Delete every payment and allocation row.
    ///
    /// Returns (payments_removed, allocations_removed). Used only by the
    /// confirmation-gated purge action.
    pub fn delete_all(&self) -> Result<(u64, u64), RemitaError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .transaction()
                .map_err(|e| RemitaError::Storage(format!("Failed to begin transaction: {}", e)))?;

            let allocations = tx
                .execute("DELETE FROM invoice_allocations", [])
                .map_err(|e| RemitaError::Storage(format!("Failed to purge allocations: {}", e)))?;
            let payments = tx
                .execute("DELETE FROM payments", [])
                .map_err(|e| RemitaError::Storage(format!("Failed to purge payments: {}", e)))?;

            tx.commit()
                .map_err(|e| RemitaError::Storage(format!("Failed to commit purge: {}", e)))?;

            Ok((payments as u64, allocations as u64))
        })
    }
}

fn row_to_payment(row: &rusqlite::Row<'_>) -> Result<PaymentRecord, RemitaError> {
    let date_str: String = row
        .get(2)
        .map_err(|e| RemitaError::Storage(e.to_string()))?;
    let total_str: String = row
        .get(4)
        .map_err(|e| RemitaError::Storage(e.to_string()))?;
    let invoice_count: i64 = row
        .get(5)
        .map_err(|e| RemitaError::Storage(e.to_string()))?;

    Ok(PaymentRecord {
        payment_reference: row.get(0).map_err(|e| RemitaError::Storage(e.to_string()))?,
        customer_id: row.get(1).map_err(|e| RemitaError::Storage(e.to_string()))?,
        payment_date: NaiveDate::from_str(&date_str)
            .map_err(|e| RemitaError::Storage(format!("Corrupt payment_date: {}", e)))?,
        payment_method: row.get(3).map_err(|e| RemitaError::Storage(e.to_string()))?,
        total_payment: Decimal::from_str(&total_str)
            .map_err(|e| RemitaError::Storage(format!("Corrupt total_payment: {}", e)))?,
        invoice_count: invoice_count as usize,
    })
}

fn row_to_allocation(row: &rusqlite::Row<'_>) -> Result<AllocationRecord, RemitaError> {
    let invoice_amount: String = row
        .get(2)
        .map_err(|e| RemitaError::Storage(e.to_string()))?;
    let amount_paid: String = row
        .get(3)
        .map_err(|e| RemitaError::Storage(e.to_string()))?;

    Ok(AllocationRecord {
        payment_reference: row.get(0).map_err(|e| RemitaError::Storage(e.to_string()))?,
        invoice_number: row.get(1).map_err(|e| RemitaError::Storage(e.to_string()))?,
        invoice_amount: Decimal::from_str(&invoice_amount)
            .map_err(|e| RemitaError::Storage(format!("Corrupt invoice_amount: {}", e)))?,
        amount_paid: Decimal::from_str(&amount_paid)
            .map_err(|e| RemitaError::Storage(format!("Corrupt amount_paid: {}", e)))?,
    })
}
