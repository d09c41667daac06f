//! Checkout
//!
//! Checkout orchestration: building an order summary from the cart or
//! from a single buy-now purchase, and walking a payment attempt through
//! its stages until a payment surface reports an outcome.
//!
//! This is the only place that mutates across components: a successful
//! payment clears the cart (for cart-origin orders), drops the active
//! discount, and fires the best-effort confirmation email.

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    cart::{Cart, CartObserver},
    discounts::{AppliedDiscount, DiscountEngine},
    mail::{Mailer, confirmation_message, send_best_effort},
    payments::{PaymentMethod, PaymentOutcome, TransactionRef},
    plans::{Plan, PlanId},
    pricing::{net_from_gross, tax_from_gross},
    storage::{CAPTURED_EMAIL_KEY, KeyValueStore},
};

/// Errors related to checkout orchestration.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A summary cannot be built from an empty cart.
    #[error("cannot check out an empty cart")]
    EmptyCart,

    /// The requested action is not valid in the current stage.
    #[error("cannot {action} while checkout is in the {stage} stage")]
    InvalidTransition {
        /// Stage the attempt was in.
        stage: &'static str,
        /// Action that was requested.
        action: &'static str,
    },
}

/// Where the order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOrigin {
    /// The full contents of the cart.
    Cart,

    /// A single plan bought directly, bypassing the cart.
    BuyNow,
}

/// One row of an order summary.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine<'a> {
    plan: Option<PlanId>,
    label: String,
    quantity: u32,
    amount: Money<'a, Currency>,
}

impl<'a> SummaryLine<'a> {
    /// The plan behind this row, absent for synthetic rows.
    #[must_use]
    pub fn plan(&self) -> Option<&PlanId> {
        self.plan.as_ref()
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Units on this row.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Row total. Negative for the discount row.
    #[must_use]
    pub fn amount(&self) -> Money<'a, Currency> {
        self.amount
    }
}

/// A priced order summary, ready for display and for handing to a
/// payment surface. Plain data; building one never mutates the cart.
#[derive(Debug, Clone)]
pub struct CheckoutSummary<'a> {
    origin: CheckoutOrigin,
    lines: SmallVec<[SummaryLine<'a>; 4]>,
    gross_subtotal: Money<'a, Currency>,
    discount: Option<AppliedDiscount<'a>>,
    grand_total: Money<'a, Currency>,
    tax_rate: Decimal,
}

impl<'a> CheckoutSummary<'a> {
    /// Build a summary over the cart's full contents.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::EmptyCart`] if the cart has no lines.
    pub fn from_cart<S: KeyValueStore>(
        cart: &Cart<'a, S>,
        discounts: &DiscountEngine<'a>,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let lines = cart
            .items()
            .iter()
            .map(|item| SummaryLine {
                plan: Some(item.plan().clone()),
                label: item.name().to_owned(),
                quantity: item.quantity(),
                amount: item.line_total(),
            })
            .collect();

        Ok(Self::priced(
            CheckoutOrigin::Cart,
            lines,
            cart.subtotal_gross(),
            discounts,
            cart.tax_rate(),
        ))
    }

    /// Build a summary for a single plan bought directly. The cart is
    /// neither read nor written.
    #[must_use]
    pub fn buy_now(
        plan_id: PlanId,
        plan: &Plan<'a>,
        discounts: &DiscountEngine<'a>,
        tax_rate: Decimal,
    ) -> Self {
        let gross = plan.price;
        let lines = smallvec::smallvec![SummaryLine {
            plan: Some(plan_id),
            label: plan.name.clone(),
            quantity: 1,
            amount: gross,
        }];

        Self::priced(CheckoutOrigin::BuyNow, lines, gross, discounts, tax_rate)
    }

    fn priced(
        origin: CheckoutOrigin,
        lines: SmallVec<[SummaryLine<'a>; 4]>,
        gross_subtotal: Money<'a, Currency>,
        discounts: &DiscountEngine<'a>,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            origin,
            lines,
            gross_subtotal,
            discount: discounts.active().cloned(),
            grand_total: discounts.final_total(gross_subtotal),
            tax_rate,
        }
    }

    /// Where the order came from.
    #[must_use]
    pub fn origin(&self) -> CheckoutOrigin {
        self.origin
    }

    /// The plan rows, in cart order.
    #[must_use]
    pub fn lines(&self) -> &[SummaryLine<'a>] {
        &self.lines
    }

    /// Synthetic discount row, present when a discount is active.
    #[must_use]
    pub fn discount_line(&self) -> Option<SummaryLine<'a>> {
        self.discount.as_ref().map(|discount| SummaryLine {
            plan: None,
            label: discount.display_label(),
            quantity: 1,
            amount: Money::from_minor(
                -discount.amount().to_minor_units(),
                discount.amount().currency(),
            ),
        })
    }

    /// The active discount, if any.
    #[must_use]
    pub fn discount(&self) -> Option<&AppliedDiscount<'a>> {
        self.discount.as_ref()
    }

    /// Tax-inclusive total before any discount.
    #[must_use]
    pub fn gross_subtotal(&self) -> Money<'a, Currency> {
        self.gross_subtotal
    }

    /// Net portion of the pre-discount gross (exact, unrounded).
    #[must_use]
    pub fn net_subtotal(&self) -> Decimal {
        net_from_gross(self.gross_decimal(), self.tax_rate)
    }

    /// Tax portion of the pre-discount gross (exact, unrounded).
    #[must_use]
    pub fn tax_amount(&self) -> Decimal {
        tax_from_gross(self.gross_decimal(), self.tax_rate)
    }

    /// The amount a payment surface should collect: the gross subtotal
    /// minus any active discount.
    #[must_use]
    pub fn grand_total(&self) -> Money<'a, Currency> {
        self.grand_total
    }

    /// The fractional tax rate used for the decomposition.
    #[must_use]
    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Provider-facing description: the row labels joined.
    #[must_use]
    pub fn description(&self) -> String {
        let labels: Vec<&str> = self.lines.iter().map(|line| line.label.as_str()).collect();

        labels.join(", ")
    }

    /// The single plan this order is for, when there is exactly one row.
    /// Payment links are keyed per plan, so multi-plan orders have none.
    #[must_use]
    pub fn sole_plan(&self) -> Option<&PlanId> {
        match self.lines.as_slice() {
            [only] => only.plan.as_ref(),
            _ => None,
        }
    }

    fn gross_decimal(&self) -> Decimal {
        Decimal::new(self.gross_subtotal.to_minor_units(), 2)
    }
}

/// Stages of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckoutStage {
    /// Nothing in progress.
    #[default]
    Idle,

    /// A summary has been built and shown.
    SummaryDisplayed,

    /// The shopper picked a payment method.
    PaymentMethodSelected,

    /// A payment surface is collecting payment.
    PaymentPending,
}

impl CheckoutStage {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SummaryDisplayed => "summary-displayed",
            Self::PaymentMethodSelected => "method-selected",
            Self::PaymentPending => "payment-pending",
        }
    }
}

/// How a resolved attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutResolution {
    /// Payment collected; the order is final.
    Completed {
        /// Method that collected the payment.
        method: PaymentMethod,
        /// Provider transaction reference.
        reference: TransactionRef,
    },

    /// The surface reported a failure; the summary is shown again and
    /// the attempt can be retried.
    Failed {
        /// Provider-supplied reason.
        reason: String,
    },

    /// The shopper backed out; the summary is shown again.
    Cancelled,
}

/// A single checkout attempt walking through its stages.
///
/// Invalid transitions are errors, never panics; the attempt stays in
/// its current stage when one is reported.
#[derive(Debug, Default)]
pub struct CheckoutAttempt<'a> {
    stage: CheckoutStage,
    summary: Option<CheckoutSummary<'a>>,
    method: Option<PaymentMethod>,
}

impl<'a> CheckoutAttempt<'a> {
    /// A fresh attempt in the idle stage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> CheckoutStage {
        self.stage
    }

    /// The summary under review, once one has been displayed.
    #[must_use]
    pub fn summary(&self) -> Option<&CheckoutSummary<'a>> {
        self.summary.as_ref()
    }

    /// Show `summary` to the shopper. Valid from idle, or to refresh an
    /// already displayed summary (after a cart or discount change).
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidTransition`] once a method has
    /// been selected or payment is pending.
    pub fn display_summary(&mut self, summary: CheckoutSummary<'a>) -> Result<(), CheckoutError> {
        match self.stage {
            CheckoutStage::Idle | CheckoutStage::SummaryDisplayed => {
                tracing::debug!(stage = self.stage.name(), "displaying checkout summary");

                self.summary = Some(summary);
                self.method = None;
                self.stage = CheckoutStage::SummaryDisplayed;

                Ok(())
            }
            stage => Err(CheckoutError::InvalidTransition {
                stage: stage.name(),
                action: "display a summary",
            }),
        }
    }

    /// Record the shopper's payment method. Valid once a summary is
    /// displayed; reselecting before payment starts is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidTransition`] from idle or while
    /// payment is pending.
    pub fn select_method(&mut self, method: PaymentMethod) -> Result<(), CheckoutError> {
        match self.stage {
            CheckoutStage::SummaryDisplayed | CheckoutStage::PaymentMethodSelected => {
                tracing::debug!(?method, "payment method selected");

                self.method = Some(method);
                self.stage = CheckoutStage::PaymentMethodSelected;

                Ok(())
            }
            stage => Err(CheckoutError::InvalidTransition {
                stage: stage.name(),
                action: "select a payment method",
            }),
        }
    }

    /// Hand the attempt to the selected payment surface. Returns the
    /// summary the surface should collect against.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidTransition`] unless a method has
    /// been selected.
    pub fn begin_payment(&mut self) -> Result<&CheckoutSummary<'a>, CheckoutError> {
        if self.stage != CheckoutStage::PaymentMethodSelected {
            return Err(CheckoutError::InvalidTransition {
                stage: self.stage.name(),
                action: "begin payment",
            });
        }

        let Some(summary) = self.summary.as_ref() else {
            return Err(CheckoutError::InvalidTransition {
                stage: self.stage.name(),
                action: "begin payment",
            });
        };

        tracing::debug!("payment pending");
        self.stage = CheckoutStage::PaymentPending;

        Ok(summary)
    }

    /// Feed a surface's outcome back into the attempt.
    ///
    /// Success finalizes the purchase: the cart is cleared for
    /// cart-origin orders, the discount is dropped either way, the
    /// confirmation email is sent best effort, and the attempt returns
    /// to idle. Failure and cancellation return to the displayed
    /// summary with the cart untouched, so the shopper can retry.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidTransition`] unless payment is
    /// pending.
    pub fn resolve<S: KeyValueStore>(
        &mut self,
        outcome: PaymentOutcome,
        cart: &mut Cart<'a, S>,
        discounts: &mut DiscountEngine<'a>,
        mailer: &mut dyn Mailer,
        observer: &mut dyn CartObserver,
    ) -> Result<CheckoutResolution, CheckoutError> {
        if self.stage != CheckoutStage::PaymentPending {
            return Err(CheckoutError::InvalidTransition {
                stage: self.stage.name(),
                action: "resolve a payment outcome",
            });
        }

        match outcome {
            PaymentOutcome::Succeeded(reference) => {
                let method = self.method.take().unwrap_or(PaymentMethod::Card);

                self.finalize_purchase(method, &reference, cart, discounts, mailer, observer)?;

                self.summary = None;
                self.stage = CheckoutStage::Idle;

                Ok(CheckoutResolution::Completed { method, reference })
            }
            PaymentOutcome::Failed(reason) => {
                tracing::debug!(%reason, "payment failed; summary redisplayed");
                self.stage = CheckoutStage::SummaryDisplayed;

                Ok(CheckoutResolution::Failed { reason })
            }
            PaymentOutcome::Cancelled => {
                tracing::debug!("payment cancelled; summary redisplayed");
                self.stage = CheckoutStage::SummaryDisplayed;

                Ok(CheckoutResolution::Cancelled)
            }
        }
    }

    fn finalize_purchase<S: KeyValueStore>(
        &self,
        method: PaymentMethod,
        reference: &TransactionRef,
        cart: &mut Cart<'a, S>,
        discounts: &mut DiscountEngine<'a>,
        mailer: &mut dyn Mailer,
        observer: &mut dyn CartObserver,
    ) -> Result<(), CheckoutError> {
        let Some(summary) = self.summary.as_ref() else {
            return Err(CheckoutError::InvalidTransition {
                stage: self.stage.name(),
                action: "finalize a purchase",
            });
        };

        tracing::debug!(?method, reference = %reference, "purchase finalized");

        if summary.origin() == CheckoutOrigin::Cart {
            cart.clear(observer);
        }

        discounts.remove();

        if let Some(email) = cart.store().get(CAPTURED_EMAIL_KEY) {
            let total = summary.grand_total().to_string();

            send_best_effort(
                mailer,
                &confirmation_message(&email, reference.as_str(), &total),
            );
        } else {
            tracing::debug!("no captured email; skipping confirmation message");
        }

        Ok(())
    }
}
