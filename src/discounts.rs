//! Discounts
//!
//! Discount-code validation and application. Codes come from two pools:
//! a fixed set of campaign codes, and a code earned through the email
//! popup and stored in the shopper's profile.
//!
//! A discount captures its money amount against the checkout base at the
//! moment it is applied. Only one discount can be active at a time.

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    pricing::{PricingError, percent_of_minor},
    storage::{EARNED_CODE_KEY, KeyValueStore},
};

/// Campaign codes that are always redeemable.
pub const CAMPAIGN_CODES: [&str; 3] = ["DESCUENTO10", "WELCOME10", "SAVE10"];

/// Errors related to discount codes.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// The submitted code was empty after trimming.
    #[error("no discount code was entered")]
    EmptyCode,

    /// The submitted code matched neither a campaign code nor the
    /// shopper's earned code.
    #[error("discount code {0:?} is not valid")]
    InvalidCode(String),

    /// A discount is already active; it must be removed first.
    #[error("discount code {0:?} is already applied")]
    AlreadyApplied(String),

    /// The discount amount could not be computed.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// A discount that has been validated and applied against a checkout
/// base.
///
/// The amount is fixed when the discount is applied and does not track
/// later changes to the cart; reapplying against the new base is the
/// caller's job.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDiscount<'a> {
    code: String,
    percent: Percentage,
    base: Money<'a, Currency>,
    amount: Money<'a, Currency>,
}

impl<'a> AppliedDiscount<'a> {
    /// The normalised code that was redeemed.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The percentage taken off the base.
    #[must_use]
    pub fn percent(&self) -> Percentage {
        self.percent
    }

    /// The base the discount was captured against.
    #[must_use]
    pub fn base(&self) -> Money<'a, Currency> {
        self.base
    }

    /// The captured money amount of the discount.
    #[must_use]
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }

    /// The captured base minus the discount, clamped at zero.
    #[must_use]
    pub fn final_total(&self) -> Money<'a, Currency> {
        let total = self
            .base
            .to_minor_units()
            .saturating_sub(self.amount.to_minor_units())
            .max(0);

        Money::from_minor(total, self.base.currency())
    }

    /// Label for the synthetic discount row in a rendered summary.
    #[must_use]
    pub fn display_label(&self) -> String {
        format!("Descuento ({})", self.code)
    }
}

/// Validates and tracks the single active discount for a checkout
/// session.
#[derive(Debug)]
pub struct DiscountEngine<'a> {
    percent: Percentage,
    active: Option<AppliedDiscount<'a>>,
}

impl Default for DiscountEngine<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> DiscountEngine<'a> {
    /// Engine with the standard flat rate off the order total.
    #[must_use]
    pub fn new() -> Self {
        Self::with_percent(Percentage::from(Decimal::new(10, 2)))
    }

    /// Engine with a custom rate.
    #[must_use]
    pub fn with_percent(percent: Percentage) -> Self {
        Self {
            percent,
            active: None,
        }
    }

    /// Validate `code` and apply it against `base`, capturing the
    /// discount amount.
    ///
    /// Codes are compared case-insensitively with surrounding whitespace
    /// ignored. The earned code, if the shopper has one in `store`, is
    /// accepted alongside the campaign codes.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::EmptyCode`] for a blank submission,
    /// [`DiscountError::AlreadyApplied`] if a discount is already active,
    /// [`DiscountError::InvalidCode`] for an unrecognised code, and
    /// [`DiscountError::Pricing`] if the amount cannot be computed.
    pub fn apply<S: KeyValueStore>(
        &mut self,
        code: &str,
        base: Money<'a, Currency>,
        store: &S,
    ) -> Result<&AppliedDiscount<'a>, DiscountError> {
        let normalised = code.trim().to_uppercase();

        if normalised.is_empty() {
            return Err(DiscountError::EmptyCode);
        }

        if let Some(active) = &self.active {
            return Err(DiscountError::AlreadyApplied(active.code.clone()));
        }

        if !self.is_redeemable(&normalised, store) {
            return Err(DiscountError::InvalidCode(normalised));
        }

        let off_minor = percent_of_minor(&self.percent, base.to_minor_units())?;

        Ok(self.active.insert(AppliedDiscount {
            code: normalised,
            percent: self.percent,
            base,
            amount: Money::from_minor(off_minor, base.currency()),
        }))
    }

    /// Drop the active discount, if any, so another code can be entered.
    pub fn remove(&mut self) -> Option<AppliedDiscount<'a>> {
        self.active.take()
    }

    /// The currently applied discount.
    #[must_use]
    pub fn active(&self) -> Option<&AppliedDiscount<'a>> {
        self.active.as_ref()
    }

    /// `base` minus the active discount; `base` unchanged when no
    /// discount is applied. Clamped at zero.
    #[must_use]
    pub fn final_total(&self, base: Money<'a, Currency>) -> Money<'a, Currency> {
        let off = self
            .active
            .as_ref()
            .map_or(0, |discount| discount.amount.to_minor_units());

        let total = base.to_minor_units().saturating_sub(off).max(0);

        Money::from_minor(total, base.currency())
    }

    fn is_redeemable<S: KeyValueStore>(&self, normalised: &str, store: &S) -> bool {
        if CAMPAIGN_CODES.contains(&normalised) {
            return true;
        }

        store
            .get(EARNED_CODE_KEY)
            .is_some_and(|earned| earned.trim().to_uppercase() == normalised)
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso::EUR;
    use testresult::TestResult;

    use crate::storage::MemoryStore;

    use super::*;

    #[test]
    fn campaign_codes_are_accepted_case_insensitively() -> TestResult {
        for code in ["descuento10", "  Welcome10 ", "SAVE10"] {
            let mut engine = DiscountEngine::new();
            let applied = engine.apply(code, Money::from_minor(12_100, EUR), &MemoryStore::new())?;

            assert_eq!(applied.amount(), Money::from_minor(1_210, EUR));
        }

        Ok(())
    }

    #[test]
    fn ten_percent_off_121_leaves_108_90() -> TestResult {
        let mut engine = DiscountEngine::new();
        let base = Money::from_minor(12_100, EUR);

        engine.apply("WELCOME10", base, &MemoryStore::new())?;

        assert_eq!(
            engine.final_total(base),
            Money::from_minor(10_890, EUR)
        );

        Ok(())
    }

    #[test]
    fn unknown_code_is_rejected() {
        let mut engine = DiscountEngine::new();
        let result = engine.apply("NOPE", Money::from_minor(12_100, EUR), &MemoryStore::new());

        assert!(matches!(result, Err(DiscountError::InvalidCode(code)) if code == "NOPE"));
        assert!(engine.active().is_none());
    }

    #[test]
    fn blank_code_is_rejected() {
        let mut engine = DiscountEngine::new();
        let result = engine.apply("   ", Money::from_minor(12_100, EUR), &MemoryStore::new());

        assert!(matches!(result, Err(DiscountError::EmptyCode)));
    }

    #[test]
    fn second_code_while_active_is_rejected() -> TestResult {
        let mut engine = DiscountEngine::new();
        let base = Money::from_minor(12_100, EUR);
        let store = MemoryStore::new();

        engine.apply("SAVE10", base, &store)?;
        let result = engine.apply("WELCOME10", base, &store);

        assert!(matches!(result, Err(DiscountError::AlreadyApplied(code)) if code == "SAVE10"));

        Ok(())
    }

    #[test]
    fn removing_makes_room_for_another_code() -> TestResult {
        let mut engine = DiscountEngine::new();
        let base = Money::from_minor(12_100, EUR);
        let store = MemoryStore::new();

        engine.apply("SAVE10", base, &store)?;
        let removed = engine.remove().ok_or("expected an active discount")?;
        assert_eq!(removed.code(), "SAVE10");

        engine.apply("WELCOME10", base, &store)?;
        let active = engine.active().ok_or("expected an active discount")?;
        assert_eq!(active.code(), "WELCOME10");

        Ok(())
    }

    #[test]
    fn earned_code_from_the_profile_is_accepted() -> TestResult {
        let mut store = MemoryStore::new();
        store.set(EARNED_CODE_KEY, "NEXTSITE10")?;

        let mut engine = DiscountEngine::new();
        engine.apply("nextsite10", Money::from_minor(29_900, EUR), &store)?;

        let active = engine.active().ok_or("expected an active discount")?;
        assert_eq!(active.code(), "NEXTSITE10");
        assert_eq!(active.amount(), Money::from_minor(2_990, EUR));

        Ok(())
    }

    #[test]
    fn earned_code_without_a_grant_is_rejected() {
        let mut engine = DiscountEngine::new();
        let result = engine.apply(
            "NEXTSITE10",
            Money::from_minor(29_900, EUR),
            &MemoryStore::new(),
        );

        assert!(matches!(result, Err(DiscountError::InvalidCode(_))));
    }

    #[test]
    fn captured_amount_does_not_track_a_changing_base() -> TestResult {
        let mut engine = DiscountEngine::new();

        engine.apply("SAVE10", Money::from_minor(12_100, EUR), &MemoryStore::new())?;

        // Total is computed from the amount captured at apply time, even
        // against a larger base.
        assert_eq!(
            engine.final_total(Money::from_minor(50_000, EUR)),
            Money::from_minor(48_790, EUR)
        );

        Ok(())
    }

    #[test]
    fn zero_base_yields_a_zero_discount() -> TestResult {
        let mut engine = DiscountEngine::new();
        let applied = engine.apply("SAVE10", Money::from_minor(0, EUR), &MemoryStore::new())?;

        assert_eq!(applied.amount(), Money::from_minor(0, EUR));
        assert_eq!(applied.final_total(), Money::from_minor(0, EUR));

        Ok(())
    }

    #[test]
    fn discount_never_drives_the_total_negative() -> TestResult {
        let mut engine = DiscountEngine::new();

        engine.apply("SAVE10", Money::from_minor(12_100, EUR), &MemoryStore::new())?;

        assert_eq!(
            engine.final_total(Money::from_minor(500, EUR)),
            Money::from_minor(0, EUR)
        );

        Ok(())
    }
}
