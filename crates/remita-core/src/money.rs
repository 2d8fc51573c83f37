//! Currency-safe decimal arithmetic.
//!
//! All monetary values in Remita flow through this module. Amounts are
//! `rust_decimal::Decimal`, parsed from the presentation strings the
//! upstream extraction produces (`"$1,000.00"`, `"(234.50)"`), and rounded
//! to cents with a single rounding rule applied after every arithmetic
//! operation, never deferred to display.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{RemitaError, Result};

/// Number of decimal places for all monetary values.
pub const CENT_PRECISION: u32 = 2;

/// Round a decimal to cents, half away from zero.
///
/// This is the one rounding rule used everywhere: 2.345 -> 2.35,
/// -2.345 -> -2.35.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENT_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a monetary presentation string into a cent-rounded `Decimal`.
///
/// Accepts an optional leading currency symbol, thousands separators,
/// surrounding whitespace, a leading `-`, or accounting-style parentheses
/// for negatives: `"$1,000.00"`, `"-5.5"`, `"(234.50)"`.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RemitaError::Money("empty amount string".to_string()));
    }

    let (body, negate) =
        if trimmed.starts_with('(') && trimmed.ends_with(')') && trimmed.len() >= 2 {
            (&trimmed[1..trimmed.len() - 1], true)
        } else {
            (trimmed, false)
        };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();

    let value = Decimal::from_str(&cleaned)
        .map_err(|e| RemitaError::Money(format!("cannot parse amount '{}': {}", input, e)))?;

    let value = if negate { -value } else { value };
    Ok(round_half_up(value))
}

/// Format a decimal as a presentation amount: `$1,234.56`, `-$234.50`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = round_half_up(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());

    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-${}.{}", grouped, frac_part)
    } else {
        format!("${}.{}", grouped, frac_part)
    }
}
