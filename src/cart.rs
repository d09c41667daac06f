//! Cart
//!
//! The shopping cart: an ordered collection of line items keyed by plan,
//! persisted to a key-value store as a JSON snapshot after every mutation.
//!
//! Persistence is deliberately forgiving. A missing or malformed snapshot
//! yields an empty cart, and a failed save is logged without blocking the
//! in-memory mutation; the session continues, it just won't survive a
//! reload.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    items::LineItem,
    plans::PlanId,
    pricing::{net_from_gross, tax_from_gross},
    storage::{CART_SNAPSHOT_KEY, KeyValueStore},
};

/// Errors related to cart mutations.
#[derive(Debug, Error)]
pub enum CartError {
    /// An item's currency differs from the cart currency.
    #[error("item has currency {0}, but cart has currency {1}")]
    CurrencyMismatch(&'static str, &'static str),
}

/// Change notification emitted after a cart mutation has been applied and
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// An item was added, or an existing line's quantity was incremented.
    Added {
        /// Plan that was added.
        plan: PlanId,
        /// Display name, for the transient "added" notification.
        name: String,
    },

    /// A line was removed (or a removal was requested for an absent plan).
    Removed {
        /// Plan that was removed.
        plan: PlanId,
    },

    /// A line's quantity was set directly.
    QuantitySet {
        /// Plan whose quantity changed.
        plan: PlanId,
        /// The new quantity.
        quantity: u32,
    },

    /// The cart was emptied.
    Cleared,
}

/// Observer notified after each cart mutation.
///
/// The UI layer subscribes to refresh the badge count, line items and
/// totals, and to show the transient "added to cart" notification. The
/// cart itself never renders anything.
pub trait CartObserver {
    /// Called once per mutation, after storage has been updated.
    fn cart_changed(&mut self, change: &CartChange);
}

/// Observer that ignores every change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCartObserver;

impl CartObserver for NoopCartObserver {
    fn cart_changed(&mut self, _change: &CartChange) {}
}

/// Stored snapshot shape for one line, matching the original storefront's
/// `localStorage` payload.
#[derive(Debug, Serialize, Deserialize)]
struct LineItemRecord {
    plan: String,
    price: Decimal,
    name: String,
    quantity: u32,
}

/// Shopping cart bound to a key-value store.
#[derive(Debug)]
pub struct Cart<'a, S: KeyValueStore> {
    items: Vec<LineItem<'a>>,
    currency: &'static Currency,
    tax_rate: Decimal,
    store: S,
}

impl<'a, S: KeyValueStore> Cart<'a, S> {
    /// Load a cart from the store's persisted snapshot.
    ///
    /// An absent or malformed snapshot yields an empty cart; individual
    /// records that fail to decode are skipped with a warning.
    pub fn load(store: S, currency: &'static Currency, tax_rate: Decimal) -> Self {
        let items = match store.get(CART_SNAPSHOT_KEY) {
            Some(raw) => match serde_json::from_str::<Vec<LineItemRecord>>(&raw) {
                Ok(records) => records
                    .into_iter()
                    .filter_map(|record| restore_item(record, currency))
                    .collect(),
                Err(err) => {
                    tracing::warn!(%err, "cart snapshot was malformed; starting empty");

                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        Self {
            items,
            currency,
            tax_rate,
            store,
        }
    }

    /// Add one unit of a plan to the cart.
    ///
    /// If a line for `plan` already exists its quantity is incremented;
    /// otherwise a new line is appended. The snapshot is persisted and the
    /// observer notified before returning.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CurrencyMismatch`] if `unit_price` is not in
    /// the cart's currency.
    pub fn add_item(
        &mut self,
        plan: PlanId,
        name: impl Into<String>,
        unit_price: Money<'a, Currency>,
        observer: &mut dyn CartObserver,
    ) -> Result<(), CartError> {
        if unit_price.currency() != self.currency {
            return Err(CartError::CurrencyMismatch(
                unit_price.currency().iso_alpha_code,
                self.currency.iso_alpha_code,
            ));
        }

        let name = name.into();

        if let Some(existing) = self.items.iter_mut().find(|item| item.plan() == &plan) {
            existing.increment();
        } else {
            self.items
                .push(LineItem::new(plan.clone(), name.clone(), unit_price));
        }

        self.persist();
        observer.cart_changed(&CartChange::Added { plan, name });

        Ok(())
    }

    /// Remove the line for `plan`, if present. A missing plan is a no-op,
    /// but the snapshot is still persisted and the observer notified so
    /// displays refresh uniformly.
    pub fn remove_item(&mut self, plan: &PlanId, observer: &mut dyn CartObserver) {
        self.items.retain(|item| item.plan() != plan);

        self.persist();
        observer.cart_changed(&CartChange::Removed { plan: plan.clone() });
    }

    /// Set the quantity for `plan` directly.
    ///
    /// A quantity of zero removes the line, matching [`Cart::remove_item`].
    /// Setting a quantity for a plan that is not in the cart is a no-op.
    pub fn set_quantity(&mut self, plan: &PlanId, quantity: u32, observer: &mut dyn CartObserver) {
        if quantity == 0 {
            self.remove_item(plan, observer);

            return;
        }

        let Some(item) = self.items.iter_mut().find(|item| item.plan() == plan) else {
            return;
        };

        item.set_quantity(quantity);

        self.persist();
        observer.cart_changed(&CartChange::QuantitySet {
            plan: plan.clone(),
            quantity,
        });
    }

    /// Empty the cart. Invoked after a successful cart-origin checkout.
    pub fn clear(&mut self, observer: &mut dyn CartObserver) {
        self.items.clear();

        self.persist();
        observer.cart_changed(&CartChange::Cleared);
    }

    /// The cart's line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem<'a>] {
        &self.items
    }

    /// Number of distinct lines in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines (the badge count).
    #[must_use]
    pub fn total_units(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |acc, item| acc.saturating_add(item.quantity()))
    }

    /// Tax-inclusive total over all lines.
    #[must_use]
    pub fn subtotal_gross(&self) -> Money<'a, Currency> {
        let minor = self
            .items
            .iter()
            .map(|item| item.line_total().to_minor_units())
            .sum();

        Money::from_minor(minor, self.currency)
    }

    /// Net component of the gross subtotal (exact, unrounded).
    #[must_use]
    pub fn net_subtotal(&self) -> Decimal {
        net_from_gross(minor_to_decimal(&self.subtotal_gross()), self.tax_rate)
    }

    /// Tax component of the gross subtotal (exact, unrounded).
    #[must_use]
    pub fn tax_amount(&self) -> Decimal {
        tax_from_gross(minor_to_decimal(&self.subtotal_gross()), self.tax_rate)
    }

    /// The amount to pay. Prices already include tax, so this equals the
    /// gross subtotal; tax is a decomposition for display, never an
    /// addition.
    #[must_use]
    pub fn grand_total(&self) -> Money<'a, Currency> {
        self.subtotal_gross()
    }

    /// The cart's currency.
    #[must_use]
    pub fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// The tax rate used for decomposition.
    #[must_use]
    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Shared access to the backing store (discount code lookups use the
    /// same profile store as the cart).
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the backing store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn persist(&mut self) {
        let records: Vec<LineItemRecord> = self.items.iter().map(snapshot_record).collect();

        match serde_json::to_string(&records) {
            Ok(snapshot) => {
                if let Err(err) = self.store.set(CART_SNAPSHOT_KEY, &snapshot) {
                    tracing::warn!(%err, "failed to persist cart snapshot; continuing in memory");
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to encode cart snapshot; continuing in memory");
            }
        }
    }
}

fn minor_to_decimal(amount: &Money<'_, Currency>) -> Decimal {
    Decimal::new(amount.to_minor_units(), 2)
}

fn snapshot_record(item: &LineItem<'_>) -> LineItemRecord {
    LineItemRecord {
        plan: item.plan().as_str().to_owned(),
        price: Decimal::new(item.unit_price().to_minor_units(), 2),
        name: item.name().to_owned(),
        quantity: item.quantity(),
    }
}

fn restore_item(record: LineItemRecord, currency: &'static Currency) -> Option<LineItem<'static>> {
    if record.quantity == 0 {
        tracing::warn!(plan = %record.plan, "skipping snapshot record with zero quantity");

        return None;
    }

    let minor = record
        .price
        .checked_mul(Decimal::new(100, 0))
        .and_then(|value| value.round_dp(0).to_i64());

    let Some(minor) = minor else {
        tracing::warn!(plan = %record.plan, "skipping snapshot record with unrepresentable price");

        return None;
    };

    Some(LineItem::with_quantity(
        PlanId::new(record.plan),
        record.name,
        Money::from_minor(minor, currency),
        record.quantity,
    ))
}
