//! Nextcart prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartChange, CartError, CartObserver, NoopCartObserver},
    checkout::{
        CheckoutAttempt, CheckoutError, CheckoutOrigin, CheckoutResolution, CheckoutStage,
        CheckoutSummary, SummaryLine,
    },
    config::{ConfigError, ProviderEnvironment, StoreConfig},
    discounts::{AppliedDiscount, CAMPAIGN_CODES, DiscountEngine, DiscountError},
    items::LineItem,
    mail::{MailError, Mailer, NoopMailer, OutboundEmail, RecordingMailer},
    payments::{
        CardSurface, PaymentError, PaymentLinkSurface, PaymentMethod, PaymentOutcome,
        PaymentRequest, PaymentSurface, PaypalSurface, TransactionRef, WalletSurface,
    },
    plans::{CatalogError, Plan, PlanCatalog, PlanId},
    popup::{EARNED_CODE, PopupError},
    pricing::{PricingError, net_from_gross, percent_of_minor, round_to_cents, tax_from_gross},
    receipt::{ReceiptError, receipt_to_string, write_receipt},
    storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError},
};
