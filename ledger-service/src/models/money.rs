//! Integer minor-unit money handling.
//!
//! All amounts are held and reconciled as `i64` minor units (cents/poisha);
//! decimal strings exist only at the API boundary. This keeps the milestone
//! and payment sum invariants exact instead of epsilon-approximate.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Fractional digits carried by the wire representation.
pub const MINOR_UNIT_SCALE: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid amount '{0}'")]
    Invalid(String),

    #[error("amount '{0}' has more than two fractional digits")]
    TooPrecise(String),

    #[error("amount '{0}' is out of range")]
    OutOfRange(String),
}

/// Parse a decimal string (`"1234.50"`) into minor units (`123450`).
pub fn parse_amount(s: &str) -> Result<i64, MoneyError> {
    let value: Decimal = s
        .trim()
        .parse()
        .map_err(|_| MoneyError::Invalid(s.to_string()))?;

    let scaled = value
        .checked_mul(Decimal::from(100))
        .ok_or_else(|| MoneyError::OutOfRange(s.to_string()))?;

    if !scaled.fract().is_zero() {
        return Err(MoneyError::TooPrecise(s.to_string()));
    }

    scaled
        .trunc()
        .to_i64()
        .ok_or_else(|| MoneyError::OutOfRange(s.to_string()))
}

/// Format minor units as a decimal string with two fractional digits.
pub fn format_amount(minor: i64) -> String {
    Decimal::new(minor, MINOR_UNIT_SCALE).to_string()
}

/// Share of `amount` in `total` as a display percentage, two decimal places.
pub fn percentage(amount: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (amount as f64 / total as f64 * 10_000.0).round() / 100.0
}
