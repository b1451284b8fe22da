//! Money conversion
//!
//! The engine stores amounts as scaled u64 minor units (e.g. cents).
//! This module converts between that representation and the
//! string/Decimal amounts the API layer deals in. Conversions are strict:
//! excess precision is rejected, never truncated.

use std::str::FromStr;

use rust_decimal::prelude::*;
use thiserror::Error;

/// Upper bound on the minor-unit scale. 10^19 no longer fits in u64.
pub const MAX_DECIMALS: u32 = 18;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("precision overflow: {provided} decimal places, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("amount too large")]
    Overflow,

    #[error("invalid amount format: {0}")]
    InvalidFormat(String),
}

/// Parse a client amount string into scaled minor units.
///
/// Rejects zero, negative amounts, explicit signs, and inputs with more
/// fractional digits than `decimals`.
pub fn parse_amount(amount_str: &str, decimals: u32) -> Result<u64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty amount".into()));
    }
    // Signs are rejected up front: "+1" and "-1" are both malformed here,
    // direction is never encoded in the amount.
    if amount_str.starts_with('+') || amount_str.starts_with('-') {
        return Err(MoneyError::InvalidAmount);
    }

    let decimal = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
    parse_decimal(decimal, decimals)
}

/// Convert a Decimal into scaled minor units.
///
/// Used at the API boundary where JSON amounts deserialize into
/// `rust_decimal::Decimal`.
pub fn parse_decimal(decimal: Decimal, decimals: u32) -> Result<u64, MoneyError> {
    if decimals > MAX_DECIMALS {
        return Err(MoneyError::PrecisionOverflow {
            provided: decimals,
            max: MAX_DECIMALS,
        });
    }
    if decimal.is_sign_negative() || decimal.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }
    if decimal.scale() > decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: decimal.scale(),
            max: decimals,
        });
    }

    let scaled = decimal
        .checked_mul(Decimal::from(10u64.pow(decimals)))
        .ok_or(MoneyError::Overflow)?;
    scaled.to_u64().ok_or(MoneyError::Overflow)
}

/// Format scaled minor units for display.
///
/// `display_decimals` controls the rendered precision and may be smaller
/// than the storage scale.
pub fn format_amount(value: u64, decimals: u32, display_decimals: u32) -> String {
    let decimal_value = Decimal::from(value) / Decimal::from(10u64.pow(decimals));
    format!("{:.prec$}", decimal_value, prec = display_decimals as usize)
}

/// Format scaled minor units at full storage precision
pub fn format_amount_full(value: u64, decimals: u32) -> String {
    format_amount(value, decimals, decimals)
}
