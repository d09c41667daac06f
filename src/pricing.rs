//! Pricing
//!
//! Tax-inclusive price decomposition and percentage math.
//!
//! All displayed prices already contain the tax portion. Given a gross
//! amount and a tax rate, the net and tax components are derived by exact
//! decimal division; rounding to two places happens only at the display
//! boundary via [`round_to_cents`].

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

/// Errors specific to pricing calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,
}

/// Extract the net component of a tax-inclusive amount.
///
/// `rate` is a non-negative fraction (0.21 for 21%), so the divisor is
/// always at least one.
#[must_use]
pub fn net_from_gross(gross: Decimal, rate: Decimal) -> Decimal {
    gross / (Decimal::ONE + rate)
}

/// Extract the tax component of a tax-inclusive amount.
#[must_use]
pub fn tax_from_gross(gross: Decimal, rate: Decimal) -> Decimal {
    gross - net_from_gross(gross, rate)
}

/// Round a decimal amount to two places for display.
#[must_use]
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Calculate a percentage of an amount in minor units, rounded to the
/// nearest minor unit.
///
/// # Errors
///
/// Returns [`PricingError::PercentConversion`] if the calculation
/// overflows or cannot be safely represented.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, PricingError> {
    let minor = Decimal::from_i64(minor).ok_or(PricingError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage crate doesn't expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(PricingError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::PercentConversion)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vat() -> Decimal {
        Decimal::new(21, 2)
    }

    #[test]
    fn net_from_gross_removes_included_tax() {
        let net = net_from_gross(Decimal::new(12100, 2), vat());

        assert_eq!(round_to_cents(net), Decimal::new(10000, 2));
    }

    #[test]
    fn tax_from_gross_is_the_remainder() {
        let tax = tax_from_gross(Decimal::new(12100, 2), vat());

        assert_eq!(round_to_cents(tax), Decimal::new(2100, 2));
    }

    #[test]
    fn net_and_tax_recompose_the_gross() {
        let gross = Decimal::new(29900, 2);

        let recomposed = net_from_gross(gross, vat()) + tax_from_gross(gross, vat());

        assert_eq!(recomposed, gross);
    }

    #[test]
    fn zero_rate_leaves_gross_untouched() {
        let gross = Decimal::new(5000, 2);

        assert_eq!(net_from_gross(gross, Decimal::ZERO), gross);
        assert_eq!(tax_from_gross(gross, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn round_to_cents_uses_midpoint_away_from_zero() {
        assert_eq!(
            round_to_cents(Decimal::new(51905, 3)),
            Decimal::new(5191, 2)
        );
    }

    #[test]
    fn percent_of_minor_rounds_to_nearest_unit() -> Result<(), PricingError> {
        let percent = Percentage::from(0.10);

        assert_eq!(percent_of_minor(&percent, 12100)?, 1210);
        assert_eq!(percent_of_minor(&percent, 29900)?, 2990);
        assert_eq!(percent_of_minor(&percent, 5)?, 1);

        Ok(())
    }

    #[test]
    fn percent_of_minor_overflow_returns_error() {
        let percent = Percentage::from(2.0);
        let result = percent_of_minor(&percent, i64::MAX);

        assert!(matches!(result, Err(PricingError::PercentConversion)));
    }
}
