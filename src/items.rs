//! Items
//!
//! Cart line items: one plan tier at a tax-inclusive unit price, with a
//! quantity of at least one.

use rusty_money::{Money, iso::Currency};

use crate::plans::PlanId;

/// A cart line item.
///
/// A cart holds at most one line item per [`PlanId`]; adding the same plan
/// again increments the quantity instead of duplicating the row.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem<'a> {
    plan: PlanId,
    name: String,
    unit_price: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> LineItem<'a> {
    /// Create a line item with a quantity of one.
    pub fn new(plan: PlanId, name: impl Into<String>, unit_price: Money<'a, Currency>) -> Self {
        Self::with_quantity(plan, name, unit_price, 1)
    }

    /// Create a line item with an explicit quantity.
    pub fn with_quantity(
        plan: PlanId,
        name: impl Into<String>,
        unit_price: Money<'a, Currency>,
        quantity: u32,
    ) -> Self {
        Self {
            plan,
            name: name.into(),
            unit_price,
            quantity,
        }
    }

    /// The plan this line refers to.
    #[must_use]
    pub fn plan(&self) -> &PlanId {
        &self.plan
    }

    /// Human-readable label, stored per-item for display.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tax-inclusive price of one unit.
    #[must_use]
    pub fn unit_price(&self) -> &Money<'a, Currency> {
        &self.unit_price
    }

    /// Number of units on this line.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Tax-inclusive total for this line (`unit_price` × `quantity`).
    #[must_use]
    pub fn line_total(&self) -> Money<'a, Currency> {
        let minor = self
            .unit_price
            .to_minor_units()
            .saturating_mul(i64::from(self.quantity));

        Money::from_minor(minor, self.unit_price.currency())
    }

    pub(crate) fn increment(&mut self) {
        self.quantity = self.quantity.saturating_add(1);
    }

    pub(crate) fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
    }
}
