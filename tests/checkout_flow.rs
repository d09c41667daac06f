//! Integration test for the full storefront flow.
//!
//! Walks the end-to-end scenario against the built-in catalog:
//!
//! 1. One Plan Básico in the cart: gross 299.00, which decomposes at the
//!    21% included rate into net 247.11 + IVA 51.89.
//! 2. `WELCOME10` takes a flat 10% off the gross at apply time:
//!    299.00 − 29.90 = 269.10 to collect.
//! 3. A successful payment clears the cart and the discount; a failed
//!    one leaves both in place for a retry.
//! 4. Buy-now purchases never touch the cart.

use jiff::civil::date;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::EUR};
use testresult::TestResult;

use nextcart::{mail::MessageKind, popup, prelude::*, storage::CAPTURED_EMAIL_KEY};

fn store_setup() -> TestResult<(PlanCatalog<'static>, StoreConfig)> {
    let catalog = PlanCatalog::nextsite()?;
    let config = StoreConfig::default();

    Ok((catalog, config))
}

#[test]
fn basico_end_to_end() -> TestResult {
    let (catalog, config) = store_setup()?;
    let currency = config.currency()?;

    let mut cart = Cart::load(MemoryStore::new(), currency, config.tax_rate());
    let mut discounts = DiscountEngine::new();
    let mut mailer = RecordingMailer::default();
    let mut observer = NoopCartObserver;

    let plan_id = PlanId::from("basico");
    let plan = catalog.plan(&plan_id)?.clone();

    cart.add_item(plan_id, plan.name.clone(), plan.price, &mut observer)?;

    assert_eq!(cart.grand_total(), Money::from_minor(29_900, EUR));
    assert_eq!(round_to_cents(cart.tax_amount()), Decimal::new(5_189, 2));
    assert_eq!(round_to_cents(cart.net_subtotal()), Decimal::new(24_711, 2));

    let applied = discounts
        .apply("WELCOME10", cart.grand_total(), cart.store())?
        .clone();
    assert_eq!(applied.amount(), Money::from_minor(2_990, EUR));
    assert_eq!(applied.final_total(), Money::from_minor(26_910, EUR));

    let summary = CheckoutSummary::from_cart(&cart, &discounts)?;
    assert_eq!(summary.grand_total(), Money::from_minor(26_910, EUR));

    let mut attempt = CheckoutAttempt::new();
    attempt.display_summary(summary)?;
    attempt.select_method(PaymentMethod::Card)?;

    let request = CardSurface::new(&config.stripe).prepare(attempt.begin_payment()?)?;
    assert!(matches!(
        request,
        PaymentRequest::CardElement {
            amount_minor: 26_910,
            ..
        }
    ));

    let resolution = attempt.resolve(
        PaymentOutcome::Succeeded(TransactionRef::new("ch_ok")),
        &mut cart,
        &mut discounts,
        &mut mailer,
        &mut observer,
    )?;

    assert!(matches!(resolution, CheckoutResolution::Completed { .. }));
    assert!(cart.is_empty());
    assert!(discounts.active().is_none());

    Ok(())
}

#[test]
fn failed_payment_keeps_the_cart_for_a_retry() -> TestResult {
    let (catalog, config) = store_setup()?;
    let currency = config.currency()?;

    let mut cart = Cart::load(MemoryStore::new(), currency, config.tax_rate());
    let mut discounts = DiscountEngine::new();
    let mut mailer = RecordingMailer::default();
    let mut observer = NoopCartObserver;

    let plan_id = PlanId::from("profesional");
    let plan = catalog.plan(&plan_id)?.clone();
    cart.add_item(plan_id, plan.name.clone(), plan.price, &mut observer)?;

    let mut attempt = CheckoutAttempt::new();
    attempt.display_summary(CheckoutSummary::from_cart(&cart, &discounts)?)?;
    attempt.select_method(PaymentMethod::Paypal)?;
    attempt.begin_payment()?;

    let resolution = attempt.resolve(
        PaymentOutcome::Failed("insufficient funds".to_owned()),
        &mut cart,
        &mut discounts,
        &mut mailer,
        &mut observer,
    )?;

    assert!(matches!(resolution, CheckoutResolution::Failed { .. }));
    assert_eq!(cart.len(), 1);
    assert_eq!(attempt.stage(), CheckoutStage::SummaryDisplayed);

    // Second attempt goes through.
    attempt.select_method(PaymentMethod::Card)?;
    attempt.begin_payment()?;
    let resolution = attempt.resolve(
        PaymentOutcome::Succeeded(TransactionRef::new("ch_retry")),
        &mut cart,
        &mut discounts,
        &mut mailer,
        &mut observer,
    )?;

    assert!(matches!(resolution, CheckoutResolution::Completed { .. }));
    assert!(cart.is_empty());

    Ok(())
}

#[test]
fn buy_now_bypasses_the_cart_entirely() -> TestResult {
    let (catalog, config) = store_setup()?;
    let currency = config.currency()?;

    let mut cart = Cart::load(MemoryStore::new(), currency, config.tax_rate());
    let mut discounts = DiscountEngine::new();
    let mut mailer = RecordingMailer::default();
    let mut observer = NoopCartObserver;

    // Something already sitting in the cart.
    let basico = PlanId::from("basico");
    let basico_plan = catalog.plan(&basico)?.clone();
    cart.add_item(basico, basico_plan.name.clone(), basico_plan.price, &mut observer)?;

    let premium = PlanId::from("premium");
    let premium_plan = catalog.plan(&premium)?.clone();

    let summary = CheckoutSummary::buy_now(premium, &premium_plan, &discounts, config.tax_rate());
    assert_eq!(summary.origin(), CheckoutOrigin::BuyNow);
    assert_eq!(summary.grand_total(), Money::from_minor(99_900, EUR));

    let mut attempt = CheckoutAttempt::new();
    attempt.display_summary(summary)?;
    attempt.select_method(PaymentMethod::Wallet)?;
    attempt.begin_payment()?;
    attempt.resolve(
        PaymentOutcome::Succeeded(TransactionRef::new("wallet_ok")),
        &mut cart,
        &mut discounts,
        &mut mailer,
        &mut observer,
    )?;

    assert_eq!(cart.len(), 1, "buy-now must leave the cart alone");

    Ok(())
}

#[test]
fn popup_grant_feeds_the_discount_engine_and_the_confirmation_mail() -> TestResult {
    let (catalog, config) = store_setup()?;
    let currency = config.currency()?;

    let mut cart = Cart::load(MemoryStore::new(), currency, config.tax_rate());
    let mut discounts = DiscountEngine::new();
    let mut mailer = RecordingMailer::default();
    let mut observer = NoopCartObserver;

    // Day one: popup shows, the shopper subscribes.
    let today = date(2026, 8, 29);
    assert!(popup::should_show(cart.store(), today));

    let code = popup::subscribe(cart.store_mut(), &mut mailer, "ana@example.com")?;
    popup::mark_seen(cart.store_mut(), today)?;

    assert!(!popup::should_show(cart.store(), today));
    assert_eq!(
        mailer.sent.first().map(|m| m.kind),
        Some(MessageKind::Welcome)
    );

    // The earned code is redeemable at checkout.
    let plan_id = PlanId::from("mantenimiento");
    let plan = catalog.plan(&plan_id)?.clone();
    cart.add_item(plan_id, plan.name.clone(), plan.price, &mut observer)?;

    discounts.apply(code, cart.grand_total(), cart.store())?;
    let active = discounts.active().ok_or("expected an active discount")?;
    assert_eq!(active.amount(), Money::from_minor(1_000, EUR));

    // Finalizing mails the captured address.
    assert_eq!(
        cart.store().get(CAPTURED_EMAIL_KEY).as_deref(),
        Some("ana@example.com")
    );

    let mut attempt = CheckoutAttempt::new();
    attempt.display_summary(CheckoutSummary::from_cart(&cart, &discounts)?)?;
    attempt.select_method(PaymentMethod::Card)?;
    attempt.begin_payment()?;
    attempt.resolve(
        PaymentOutcome::Succeeded(TransactionRef::new("ch_sub")),
        &mut cart,
        &mut discounts,
        &mut mailer,
        &mut observer,
    )?;

    let confirmation = mailer
        .sent
        .iter()
        .find(|m| m.kind == MessageKind::OrderConfirmation)
        .ok_or("expected a confirmation message")?;
    assert_eq!(confirmation.to, "ana@example.com");

    Ok(())
}
