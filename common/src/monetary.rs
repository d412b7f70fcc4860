//! Monetary helpers.
//!
//! Balances are `Decimal` everywhere inside the service. The wire carries
//! `double`, so conversion happens once at the RPC boundary.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Divisor turning a percentage rate into a fraction.
pub const PERCENT: Decimal = Decimal::ONE_HUNDRED;

/// Convert a wire amount into a `Decimal`.
///
/// Returns `None` for NaN, infinities and magnitudes outside the `Decimal`
/// range, including non-zero values too small to survive as anything but zero.
pub fn from_wire(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    let converted = Decimal::from_f64(value)?.normalize();
    if converted.is_zero() && value != 0.0 {
        return None;
    }
    Some(converted)
}

/// Convert a `Decimal` into a wire amount.
pub fn to_wire(value: Decimal) -> f64 {
    // Every Decimal is within f64 range; precision beyond ~15 digits is lost.
    value.to_f64().unwrap_or_default()
}

/// Check that an amount or rate is strictly positive.
pub fn is_positive(value: Decimal) -> bool {
    value > Decimal::ZERO
}
