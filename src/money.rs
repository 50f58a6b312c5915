//! Money is stored as integer cents and shown as a two-place decimal.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ApiError;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Converts a client supplied price into cents.
///
/// The price must be positive and carry at most two decimal places.
pub fn price_to_cents(amount: Decimal) -> Result<i64, ApiError> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::Validation("Price must be greater than 0".into()));
    }
    if amount.normalize().scale() > 2 {
        return Err(ApiError::Validation(
            "Price must have at most two decimal places".into(),
        ));
    }
    (amount * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| ApiError::Validation("Price is too large".into()))
}

pub fn line_total(price_cents: i64, quantity: i32) -> Result<i64, ApiError> {
    price_cents
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| ApiError::Validation("Line total is too large".into()))
}
