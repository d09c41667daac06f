//! Checkout Example
//!
//! This example walks the full storefront flow: subscribe through the
//! popup, fill the cart, apply a discount code, and resolve a simulated
//! payment.
//!
//! Use `-p` to pick a plan from the catalog
//! Use `-q` to set the quantity
//! Use `-c` to apply a discount code
//! Use `-m` to pick a payment method (card, wallet, paypal, link)
//! Use `--email` to subscribe first and earn the popup code
//! Use `--buy-now` to bypass the cart and buy the plan directly

use std::{fs::create_dir_all, io, path::PathBuf};

use anyhow::Result;

use clap::Parser;
use jiff::Timestamp;
use nextcart::prelude::*;

/// Checkout Example
#[derive(Debug, Parser)]
struct Args {
    /// Plan to buy.
    #[arg(short, long, default_value = "basico")]
    plan: String,

    /// How many units to add to the cart.
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,

    /// Discount code to apply.
    #[arg(short, long)]
    code: Option<String>,

    /// Payment method.
    #[arg(short, long, default_value = "card")]
    method: String,

    /// Subscribe this address through the popup before shopping.
    #[arg(long)]
    email: Option<String>,

    /// Buy the plan directly instead of going through the cart.
    #[arg(long)]
    buy_now: bool,
}

/// Observer that prints cart changes as a UI would react to them.
struct PrintObserver;

#[expect(clippy::print_stdout, reason = "Example code")]
impl CartObserver for PrintObserver {
    fn cart_changed(&mut self, change: &CartChange) {
        match change {
            CartChange::Added { name, .. } => println!("🛒 {name} añadido al carrito"),
            CartChange::Removed { plan } => println!("🛒 {plan} eliminado del carrito"),
            CartChange::QuantitySet { plan, quantity } => {
                println!("🛒 {plan} ahora x{quantity}");
            }
            CartChange::Cleared => println!("🛒 carrito vaciado"),
        }
    }
}

#[expect(clippy::print_stdout, reason = "Example code")]
pub fn main() -> Result<()> {
    let args = Args::parse();

    let catalog = PlanCatalog::nextsite()?;
    let config = StoreConfig::default();
    let currency = config.currency()?;

    let store_dir = PathBuf::from("target").join("nextcart");
    create_dir_all(&store_dir)?;
    let store = JsonFileStore::open(store_dir.join("store.json"));

    let mut cart = Cart::load(store, currency, config.tax_rate());
    let mut discounts = DiscountEngine::new();
    let mut mailer = RecordingMailer::default();
    let mut observer = PrintObserver;

    if let Some(email) = args.email.as_deref() {
        let earned = nextcart::popup::subscribe(cart.store_mut(), &mut mailer, email)?;
        println!("📧 suscripción registrada; código obtenido: {earned}");
    }

    let plan_id = PlanId::from(args.plan.as_str());
    let plan = catalog.plan(&plan_id)?.clone();

    let mut attempt = CheckoutAttempt::new();

    if !args.buy_now {
        for _ in 0..args.quantity.max(1) {
            cart.add_item(plan_id.clone(), plan.name.clone(), plan.price, &mut observer)?;
        }
    }

    if let Some(code) = args.code.as_deref() {
        let base = if args.buy_now {
            plan.price
        } else {
            cart.grand_total()
        };

        match discounts.apply(code, base, cart.store()) {
            Ok(applied) => println!(
                "✅ código {} aplicado: -{}",
                applied.code(),
                applied.amount()
            ),
            Err(err) => println!("❌ {err}"),
        }
    }

    let summary = if args.buy_now {
        CheckoutSummary::buy_now(plan_id, &plan, &discounts, config.tax_rate())
    } else {
        CheckoutSummary::from_cart(&cart, &discounts)?
    };

    write_receipt(&mut io::stdout(), &summary)?;

    let surface: Box<dyn PaymentSurface> = match args.method.as_str() {
        "wallet" => Box::new(WalletSurface::new(&config.wallet)),
        "paypal" => Box::new(PaypalSurface::new(&config.paypal)),
        "link" => Box::new(PaymentLinkSurface::new(&config.stripe)),
        _ => Box::new(CardSurface::new(&config.stripe)),
    };

    attempt.display_summary(summary)?;
    attempt.select_method(surface.method())?;

    let request = surface.prepare(attempt.begin_payment()?)?;
    println!("➡️  solicitud enviada al proveedor: {request:#?}");

    // Collection happens outside the library; simulate an approval.
    let reference = TransactionRef::generate(Timestamp::now());
    let resolution = attempt.resolve(
        PaymentOutcome::Succeeded(reference),
        &mut cart,
        &mut discounts,
        &mut mailer,
        &mut observer,
    )?;

    match resolution {
        CheckoutResolution::Completed { method, reference } => {
            println!("✅ pago completado con {method:?}, referencia {reference}");
        }
        CheckoutResolution::Failed { reason } => println!("❌ pago fallido: {reason}"),
        CheckoutResolution::Cancelled => println!("🚫 pago cancelado"),
    }

    for message in &mailer.sent {
        println!("✉️  {} → {}", message.subject, message.to);
    }

    Ok(())
}
