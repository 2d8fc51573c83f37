//! Ledger service: payment storage and reconciliation analysis.
//!
//! Validates invoice-count consistency before any write, persists the
//! payment with its allocations atomically, and analyzes whether a stored
//! payment reconciles against its allocations within a tolerance. All
//! arithmetic goes through the currency-safe money module.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use remita_core::money;
use remita_storage::{AllocationRecord, Database, LedgerRepository, PaymentRecord};

use crate::error::LedgerError;
use crate::remittance::{InvoiceDetail, RemittanceFields};

/// Overall outcome of a reconciliation analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Reconciled,
    DiscrepancyFound,
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationStatus::Reconciled => write!(f, "reconciled"),
            ReconciliationStatus::DiscrepancyFound => write!(f, "discrepancy_found"),
        }
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reconciled" => Ok(ReconciliationStatus::Reconciled),
            "discrepancy_found" => Ok(ReconciliationStatus::DiscrepancyFound),
            _ => Err(format!("Unknown reconciliation status: {}", s)),
        }
    }
}

/// Per-invoice comparison of invoiced amount against amount paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFinding {
    pub invoice_number: String,
    pub invoice_amount: Decimal,
    pub amount_paid: Decimal,
    /// invoice_amount - amount_paid, rounded to cents.
    pub difference: Decimal,
    pub flagged: bool,
}

/// Result of the matching phase, consumed by the status-update action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub payment_reference: String,
    pub customer_id: String,
    pub status: ReconciliationStatus,
    pub total_payment: Decimal,
    pub allocated_total: Decimal,
    /// total_payment - allocated_total, rounded to cents.
    pub difference: Decimal,
    pub threshold: Decimal,
    pub invoice_findings: Vec<InvoiceFinding>,
    pub analyzed_at: DateTime<Utc>,
}

impl ReconciliationResult {
    pub fn is_reconciled(&self) -> bool {
        self.status == ReconciliationStatus::Reconciled
    }
}

/// Stores payments with their allocations and runs discrepancy analysis.
pub struct LedgerService {
    repo: LedgerRepository,
}

impl LedgerService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            repo: LedgerRepository::new(db),
        }
    }

    /// Persist a payment and its invoice allocations atomically.
    ///
    /// The header's invoice count must equal the number of detail rows;
    /// a mismatch is a hard validation error raised before any write.
    pub fn store_payment(
        &self,
        fields: &RemittanceFields,
        invoices: &[InvoiceDetail],
    ) -> Result<PaymentRecord, LedgerError> {
        if fields.invoice_count != invoices.len() {
            return Err(LedgerError::InvoiceCountMismatch {
                expected: fields.invoice_count,
                actual: invoices.len(),
            });
        }

        if self.repo.find_payment(&fields.payment_reference)?.is_some() {
            return Err(LedgerError::DuplicatePayment(
                fields.payment_reference.clone(),
            ));
        }

        let payment = PaymentRecord {
            payment_reference: fields.payment_reference.clone(),
            customer_id: fields.customer_id.clone(),
            payment_date: fields.payment_date,
            payment_method: fields.payment_method.clone(),
            total_payment: money::round_half_up(fields.total_payment_paid),
            invoice_count: fields.invoice_count,
        };

        let allocations: Vec<AllocationRecord> = invoices
            .iter()
            .map(|invoice| AllocationRecord {
                payment_reference: fields.payment_reference.clone(),
                invoice_number: invoice.invoice_number.clone(),
                invoice_amount: money::round_half_up(invoice.invoice_amount),
                amount_paid: money::round_half_up(invoice.amount_paid),
            })
            .collect();

        self.repo
            .insert_payment_with_allocations(&payment, &allocations)?;

        info!(
            payment_reference = %payment.payment_reference,
            customer_id = %payment.customer_id,
            allocation_count = allocations.len(),
            "Payment stored with allocations"
        );

        Ok(payment)
    }

    /// Analyze whether a stored payment reconciles within the threshold.
    ///
    /// The discrepancy is flagged iff |total_payment - sum(allocations)|
    /// exceeds the threshold; the reported difference is the exact decimal
    /// delta.
    pub fn analyze(
        &self,
        payment_reference: &str,
        threshold: Decimal,
    ) -> Result<ReconciliationResult, LedgerError> {
        let payment = self
            .repo
            .find_payment(payment_reference)?
            .ok_or_else(|| LedgerError::PaymentNotFound(payment_reference.to_string()))?;

        let allocations = self.repo.allocations_for(payment_reference)?;

        let allocated_total = money::round_half_up(
            allocations
                .iter()
                .map(|a| a.amount_paid)
                .sum::<Decimal>(),
        );
        let difference = money::round_half_up(payment.total_payment - allocated_total);

        let status = if difference.abs() > threshold {
            ReconciliationStatus::DiscrepancyFound
        } else {
            ReconciliationStatus::Reconciled
        };

        let invoice_findings: Vec<InvoiceFinding> = allocations
            .iter()
            .map(|a| {
                let delta = money::round_half_up(a.invoice_amount - a.amount_paid);
                InvoiceFinding {
                    invoice_number: a.invoice_number.clone(),
                    invoice_amount: a.invoice_amount,
                    amount_paid: a.amount_paid,
                    difference: delta,
                    flagged: !delta.is_zero(),
                }
            })
            .collect();

        debug!(
            payment_reference,
            %allocated_total,
            %difference,
            %status,
            "Reconciliation analysis complete"
        );

        Ok(ReconciliationResult {
            payment_reference: payment.payment_reference,
            customer_id: payment.customer_id,
            status,
            total_payment: payment.total_payment,
            allocated_total,
            difference,
            threshold,
            invoice_findings,
            analyzed_at: Utc::now(),
        })
    }
}
