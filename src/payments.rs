//! Payments
//!
//! Boundary contracts for payment collection. A [`PaymentSurface`]
//! turns an order summary into the provider-specific request payload;
//! the actual money movement happens outside this crate, and the result
//! comes back as a [`PaymentOutcome`] fed to the checkout attempt.

use jiff::Timestamp;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    checkout::CheckoutSummary,
    config::{PaypalConfig, ProviderEnvironment, StripeConfig, WalletConfig},
    plans::PlanId,
};

/// Errors related to preparing a payment request.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The plan has no hosted payment link configured.
    #[error("plan {0} has no payment link configured")]
    LinkUnavailable(PlanId),

    /// Payment links are keyed per plan, so a multi-plan order cannot
    /// use one.
    #[error("payment links only support single-plan orders")]
    MultiPlanLink,
}

/// The ways an order can be paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    /// Hosted card element.
    Card,

    /// Device wallet (Apple Pay / Google Pay) session.
    Wallet,

    /// PayPal order.
    Paypal,

    /// Hosted per-plan payment link.
    PaymentLink,
}

/// Provider transaction reference for a completed payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRef(String);

impl TransactionRef {
    /// Wrap a provider-supplied reference.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Synthesize an order reference from a timestamp, for providers
    /// that don't supply one.
    #[must_use]
    pub fn generate(at: Timestamp) -> Self {
        Self(format!("ORD-{}", at.strftime("%Y%m%d%H%M%S")))
    }

    /// The reference string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a payment attempt ended, reported by the external collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment collected.
    Succeeded(TransactionRef),

    /// The provider declined or errored.
    Failed(String),

    /// The shopper backed out of the provider flow.
    Cancelled,
}

/// Provider-specific payload handed to the outside collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequest {
    /// Mount a hosted card element and charge it.
    CardElement {
        /// Client-side key for the element.
        publishable_key: String,
        /// Amount in minor units.
        amount_minor: i64,
        /// ISO-4217 code.
        currency: String,
        /// Statement/sheet description.
        description: String,
    },

    /// Open a device-wallet payment sheet.
    WalletSession {
        /// Registered merchant id.
        merchant_id: String,
        /// Name on the payment sheet.
        merchant_name: String,
        /// Merchant country.
        country_code: String,
        /// ISO-4217 code.
        currency: String,
        /// Accepted card networks.
        supported_networks: Vec<String>,
        /// Amount in minor units.
        amount_minor: i64,
    },

    /// Create a PayPal order.
    PaypalOrder {
        /// OAuth client id.
        client_id: String,
        /// Sandbox or production.
        environment: ProviderEnvironment,
        /// Checkout locale.
        locale: String,
        /// ISO-4217 code.
        currency: String,
        /// Amount in major units.
        amount: Decimal,
        /// PayPal.me fallback link with the amount and currency
        /// appended, for shoppers who skip the button flow.
        me_link: String,
    },

    /// Redirect to a hosted payment link.
    LinkRedirect {
        /// Absolute URL of the hosted page.
        url: String,
    },
}

/// A payment provider able to turn a summary into a request payload.
pub trait PaymentSurface {
    /// Which [`PaymentMethod`] this surface implements.
    fn method(&self) -> PaymentMethod;

    /// Build the provider payload for `summary`.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] when the summary cannot be collected
    /// through this surface.
    fn prepare(&self, summary: &CheckoutSummary<'_>) -> Result<PaymentRequest, PaymentError>;
}

/// Hosted card element.
#[derive(Debug, Clone, Copy)]
pub struct CardSurface<'c> {
    stripe: &'c StripeConfig,
}

impl<'c> CardSurface<'c> {
    /// Surface over the store's card settings.
    #[must_use]
    pub fn new(stripe: &'c StripeConfig) -> Self {
        Self { stripe }
    }
}

impl PaymentSurface for CardSurface<'_> {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Card
    }

    fn prepare(&self, summary: &CheckoutSummary<'_>) -> Result<PaymentRequest, PaymentError> {
        let total = summary.grand_total();

        Ok(PaymentRequest::CardElement {
            publishable_key: self.stripe.publishable_key.clone(),
            amount_minor: total.to_minor_units(),
            currency: total.currency().iso_alpha_code.to_owned(),
            description: summary.description(),
        })
    }
}

/// Device-wallet session.
#[derive(Debug, Clone, Copy)]
pub struct WalletSurface<'c> {
    wallet: &'c WalletConfig,
}

impl<'c> WalletSurface<'c> {
    /// Surface over the store's wallet settings.
    #[must_use]
    pub fn new(wallet: &'c WalletConfig) -> Self {
        Self { wallet }
    }
}

impl PaymentSurface for WalletSurface<'_> {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Wallet
    }

    fn prepare(&self, summary: &CheckoutSummary<'_>) -> Result<PaymentRequest, PaymentError> {
        let total = summary.grand_total();

        Ok(PaymentRequest::WalletSession {
            merchant_id: self.wallet.merchant_id.clone(),
            merchant_name: self.wallet.merchant_name.clone(),
            country_code: self.wallet.country_code.clone(),
            currency: total.currency().iso_alpha_code.to_owned(),
            supported_networks: self.wallet.supported_networks.clone(),
            amount_minor: total.to_minor_units(),
        })
    }
}

/// PayPal order.
#[derive(Debug, Clone, Copy)]
pub struct PaypalSurface<'c> {
    paypal: &'c PaypalConfig,
}

impl<'c> PaypalSurface<'c> {
    /// Surface over the store's PayPal settings.
    #[must_use]
    pub fn new(paypal: &'c PaypalConfig) -> Self {
        Self { paypal }
    }
}

impl PaymentSurface for PaypalSurface<'_> {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paypal
    }

    fn prepare(&self, summary: &CheckoutSummary<'_>) -> Result<PaymentRequest, PaymentError> {
        let total = summary.grand_total();
        let code = total.currency().iso_alpha_code;
        let amount = Decimal::new(total.to_minor_units(), 2);

        Ok(PaymentRequest::PaypalOrder {
            client_id: self.paypal.client_id.clone(),
            environment: self.paypal.environment,
            locale: self.paypal.locale.clone(),
            currency: code.to_owned(),
            amount,
            me_link: format!("{}/{amount}{code}", self.paypal.me_link_base),
        })
    }
}

/// Hosted per-plan payment link.
#[derive(Debug, Clone, Copy)]
pub struct PaymentLinkSurface<'c> {
    stripe: &'c StripeConfig,
}

impl<'c> PaymentLinkSurface<'c> {
    /// Surface over the store's payment-link table.
    #[must_use]
    pub fn new(stripe: &'c StripeConfig) -> Self {
        Self { stripe }
    }
}

impl PaymentSurface for PaymentLinkSurface<'_> {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::PaymentLink
    }

    fn prepare(&self, summary: &CheckoutSummary<'_>) -> Result<PaymentRequest, PaymentError> {
        let Some(plan) = summary.sole_plan() else {
            return Err(PaymentError::MultiPlanLink);
        };

        let url = self
            .stripe
            .payment_link(plan)
            .ok_or_else(|| PaymentError::LinkUnavailable(plan.clone()))?;

        Ok(PaymentRequest::LinkRedirect {
            url: url.to_owned(),
        })
    }
}
