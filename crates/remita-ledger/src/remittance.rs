//! Remittance document parsing.
//!
//! The upstream document-intelligence system delivers extracted content as
//! a JSON map of presentation strings. This module turns that map into the
//! immutable typed header (`RemittanceFields`) and invoice lines
//! (`InvoiceDetail`), pushing every monetary string through the
//! currency-safe parser.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use remita_core::money;

use crate::error::LedgerError;

/// Parsed financial header of a remittance document.
///
/// Immutable once parsed from the source document content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemittanceFields {
    pub customer_id: String,
    pub customer_name: String,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub payment_reference: String,
    pub total_payment_paid: Decimal,
    pub total_invoice_amount: Decimal,
    pub total_discounts: Decimal,
    pub total_charges: Decimal,
    pub bank_account: String,
    pub notes: String,
    pub invoice_count: usize,
}

/// One invoice line of a remittance: the invoice and what was paid on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice_number: String,
    pub invoice_amount: Decimal,
    pub amount_paid: Decimal,
}

impl RemittanceFields {
    /// Parse the remittance header from the upstream `fields` map.
    ///
    /// Required fields raise `MissingField`; malformed values raise
    /// `InvalidField` naming the field.
    pub fn parse(fields: &serde_json::Value) -> Result<Self, LedgerError> {
        let payment_date_raw = required_str(fields, "Payment Date")?;
        let payment_date = payment_date_raw
            .parse::<NaiveDate>()
            .map_err(|e| LedgerError::InvalidField {
                field: "Payment Date".to_string(),
                message: e.to_string(),
            })?;

        let invoice_count_raw = required_str(fields, "Total Invoices")?;
        let invoice_count =
            invoice_count_raw
                .trim()
                .parse::<usize>()
                .map_err(|e| LedgerError::InvalidField {
                    field: "Total Invoices".to_string(),
                    message: e.to_string(),
                })?;

        Ok(Self {
            customer_id: required_str(fields, "Customer ID")?.to_string(),
            customer_name: optional_str(fields, "Customer Name"),
            payment_date,
            payment_method: optional_str(fields, "Payment Method"),
            payment_reference: required_str(fields, "Payment Reference")?.to_string(),
            total_payment_paid: required_amount(fields, "Total Payment Paid")?,
            total_invoice_amount: required_amount(fields, "Total Invoice Amount")?,
            total_discounts: optional_amount(fields, "Total Discounts")?,
            total_charges: optional_amount(fields, "Total Charges")?,
            bank_account: optional_str(fields, "Bank Account"),
            notes: optional_str(fields, "Notes"),
            invoice_count,
        })
    }
}

impl InvoiceDetail {
    /// Parse the invoice detail rows from the upstream `invoices` array.
    pub fn parse_lines(lines: &serde_json::Value) -> Result<Vec<Self>, LedgerError> {
        let array = lines
            .as_array()
            .ok_or_else(|| LedgerError::MissingField("invoices".to_string()))?;

        array
            .iter()
            .map(|line| {
                Ok(Self {
                    invoice_number: required_str(line, "Invoice Reference")?.to_string(),
                    invoice_amount: required_amount(line, "Invoice Amount")?,
                    amount_paid: required_amount(line, "Amount Paid")?,
                })
            })
            .collect()
    }
}

fn required_str<'a>(map: &'a serde_json::Value, key: &str) -> Result<&'a str, LedgerError> {
    match map.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(LedgerError::MissingField(key.to_string())),
    }
}

fn optional_str(map: &serde_json::Value, key: &str) -> String {
    map.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn required_amount(map: &serde_json::Value, key: &str) -> Result<Decimal, LedgerError> {
    let raw = required_str(map, key)?;
    money::parse_amount(raw).map_err(|e| LedgerError::InvalidField {
        field: key.to_string(),
        message: e.to_string(),
    })
}

fn optional_amount(map: &serde_json::Value, key: &str) -> Result<Decimal, LedgerError> {
    match map.get(key).and_then(|v| v.as_str()) {
        Some(raw) if !raw.trim().is_empty() => {
            money::parse_amount(raw).map_err(|e| LedgerError::InvalidField {
                field: key.to_string(),
                message: e.to_string(),
            })
        }
        _ => Ok(Decimal::ZERO),
    }
}
