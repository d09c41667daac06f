//! Receipt
//!
//! Presentation-only rendering of a checkout summary: the order lines as
//! a table followed by a totals block. Consumes the orchestrator's plain
//! data and writes to any [`io::Write`].

use std::io;

use rust_decimal::Decimal;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{Alignment, Style, Theme, object::Columns},
};
use thiserror::Error;

use crate::{checkout::CheckoutSummary, pricing::round_to_cents};

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Error writing to the output.
    #[error("Failed writing receipt output")]
    IO,
}

/// Write `summary` to `out` as a table of lines plus a totals block.
///
/// # Errors
///
/// Returns [`ReceiptError::IO`] if the output cannot be written.
pub fn write_receipt(
    out: &mut impl io::Write,
    summary: &CheckoutSummary<'_>,
) -> Result<(), ReceiptError> {
    let mut builder = Builder::default();

    builder.push_record(["Concepto", "Cantidad", "Importe"]);

    for line in summary.lines() {
        builder.push_record([
            line.label().to_owned(),
            line.quantity().to_string(),
            line.amount().to_string(),
        ]);
    }

    if let Some(discount) = summary.discount_line() {
        builder.push_record([
            discount.label().to_owned(),
            String::new(),
            discount.amount().to_string(),
        ]);
    }

    write_receipt_table(out, builder)?;
    write_receipt_totals(out, summary)
}

/// Render `summary` to a string, for callers without a writer.
///
/// # Errors
///
/// Returns [`ReceiptError::IO`] if the rendered bytes are not valid
/// UTF-8, which would indicate a rendering bug.
pub fn receipt_to_string(summary: &CheckoutSummary<'_>) -> Result<String, ReceiptError> {
    let mut out = Vec::new();

    write_receipt(&mut out, summary)?;

    String::from_utf8(out).map_err(|_err| ReceiptError::IO)
}

fn write_receipt_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());
    let separator = HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤'));

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, separator);

    table.with(theme);
    table.modify(Columns::new(1..3), Alignment::right());

    writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)
}

fn write_receipt_totals(
    out: &mut impl io::Write,
    summary: &CheckoutSummary<'_>,
) -> Result<(), ReceiptError> {
    let tax_points = (summary.tax_rate() * Decimal::ONE_HUNDRED).normalize();

    let mut rows: Vec<(String, String)> = vec![(
        " Subtotal:".to_owned(),
        summary.gross_subtotal().to_string(),
    )];

    if let Some(discount) = summary.discount() {
        rows.push((
            format!(" {}:", discount.display_label()),
            format!("-{}", discount.amount()),
        ));
    }

    rows.push((
        " Base imponible:".to_owned(),
        round_to_cents(summary.net_subtotal()).to_string(),
    ));
    rows.push((
        format!(" IVA ({tax_points}%):"),
        round_to_cents(summary.tax_amount()).to_string(),
    ));
    rows.push((" Total:".to_owned(), summary.grand_total().to_string()));

    let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let value_width = rows.iter().map(|(_, value)| value.len()).max().unwrap_or(0);

    for (label, value) in rows {
        writeln!(out, "{label:<label_width$} {value:>value_width$}")
            .map_err(|_err| ReceiptError::IO)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rusty_money::{Money, iso::EUR};
    use testresult::TestResult;

    use crate::{
        cart::{Cart, NoopCartObserver},
        discounts::DiscountEngine,
        plans::PlanId,
        storage::MemoryStore,
    };

    use super::*;

    #[test]
    fn receipt_lists_lines_discount_and_totals() -> TestResult {
        let mut cart = Cart::load(MemoryStore::new(), EUR, Decimal::new(21, 2));
        let mut observer = NoopCartObserver;
        let mut discounts = DiscountEngine::new();

        cart.add_item(
            PlanId::from("basico"),
            "Plan Básico",
            Money::from_minor(29_900, EUR),
            &mut observer,
        )?;
        discounts.apply("WELCOME10", cart.grand_total(), cart.store())?;

        let summary = CheckoutSummary::from_cart(&cart, &discounts)?;
        let rendered = receipt_to_string(&summary)?;

        assert!(rendered.contains("Plan Básico"));
        assert!(rendered.contains("Descuento (WELCOME10)"));
        assert!(rendered.contains("Base imponible:"));
        assert!(rendered.contains("IVA (21%):"));
        assert!(rendered.contains("247.11"));

        Ok(())
    }

    #[test]
    fn receipt_without_discount_has_no_discount_row() -> TestResult {
        let mut cart = Cart::load(MemoryStore::new(), EUR, Decimal::new(21, 2));
        let mut observer = NoopCartObserver;

        cart.add_item(
            PlanId::from("mantenimiento"),
            "Plan de Mantenimiento",
            Money::from_minor(10_000, EUR),
            &mut observer,
        )?;

        let summary = CheckoutSummary::from_cart(&cart, &DiscountEngine::new())?;
        let rendered = receipt_to_string(&summary)?;

        assert!(!rendered.contains("Descuento"));
        assert!(rendered.contains("Plan de Mantenimiento"));

        Ok(())
    }
}
