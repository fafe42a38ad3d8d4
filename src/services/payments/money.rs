use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::errors::ServiceError;

/// Converts a major-unit amount (e.g. rupees) into integer minor units (paise).
///
/// Rounds half away from zero at the hundredths place before scaling, so
/// `10.005` becomes `1001`. This is the only place the charged amount is derived.
/// The amount actually charged, in major units: rounded half away from zero to two places.
pub fn round_to_charge(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "amount must be greater than zero".to_string(),
        ));
    }

    let minor = (round_to_charge(amount) * dec!(100))
        .to_i64()
        .ok_or_else(|| ServiceError::ValidationError("amount is out of range".to_string()))?;

    if minor == 0 {
        return Err(ServiceError::ValidationError(
            "amount rounds to zero".to_string(),
        ));
    }
    Ok(minor)
}
