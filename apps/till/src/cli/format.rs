//! Plain-text rendering of carts, products and receipts.

use std::fmt::Write as _;

use till_core::{Cart, CartTotals, InventoryLogEntry, Money, Product, Receipt, Sale};

use crate::config::AppConfig;

const RULE: &str = "----------------------------------------";

pub(super) fn product_line(product: &Product, config: &AppConfig) -> String {
    let mut line = format!(
        "{:<12} {:<28} {:>10}  stock {:>4}",
        product.sku,
        truncate(&product.name, 28),
        config.format_currency(product.selling_price()),
        product.stock
    );
    if product.is_low_stock() {
        line.push_str("  LOW");
    }
    if !product.is_active {
        line.push_str("  (archived)");
    }
    line
}

pub(super) fn product_details(product: &Product, config: &AppConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", product.name, product.sku);
    let _ = writeln!(
        out,
        "  Price: {}  Cost: {}",
        config.format_currency(product.selling_price()),
        config.format_currency(product.purchase_price())
    );
    let _ = writeln!(out, "  Stock: {}  Restock at: {}", product.stock, product.min_stock);
    if let Some(category) = &product.category {
        let _ = writeln!(out, "  Category: {}", category);
    }
    if let Some(description) = &product.description {
        let _ = writeln!(out, "  Description: {}", description);
    }
    if let Some(image_path) = &product.image_path {
        let _ = writeln!(out, "  Image: {}", image_path);
    }
    if !product.is_active {
        let _ = writeln!(out, "  Archived");
    }
    out.trim_end().to_string()
}

pub(super) fn history_line(entry: &InventoryLogEntry) -> String {
    format!(
        "{}  {:>+6}  {:<10} {}",
        entry.created_at.format("%Y-%m-%d %H:%M"),
        entry.delta,
        entry.reason.to_string(),
        entry.note.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

pub(super) fn cart_text(cart: &Cart, totals: &CartTotals, config: &AppConfig) -> String {
    if cart.is_empty() {
        return "Cart is empty.".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        let _ = writeln!(
            out,
            "{:>4} x {:<28} {:>10} {:>10}",
            item.quantity,
            truncate(&item.name, 28),
            config.format_currency(item.unit_price()),
            config.format_currency(item.line_total())
        );
    }
    let _ = writeln!(out, "{}", RULE);
    write_totals(&mut out, totals.subtotal, totals.discount, totals.tax, totals.total, config);
    out.trim_end().to_string()
}

pub(super) fn receipt_text(receipt: &Receipt, config: &AppConfig) -> String {
    let sale = &receipt.sale;
    let mut out = String::new();

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "{}", config.store_name);
    let _ = writeln!(out, "Receipt {}", sale.receipt_number);
    let _ = writeln!(
        out,
        "{}  Cashier: {}",
        sale.created_at.format("%Y-%m-%d %H:%M"),
        sale.cashier_username
    );
    let _ = writeln!(out, "{}", RULE);
    for item in &receipt.items {
        let _ = writeln!(
            out,
            "{:>4} x {:<28} {:>10} {:>10}",
            item.quantity,
            truncate(&item.name_snapshot, 28),
            config.format_currency(item.unit_price()),
            config.format_currency(item.line_total())
        );
    }
    let _ = writeln!(out, "{}", RULE);
    write_totals(
        &mut out,
        sale.subtotal(),
        sale.discount(),
        sale.tax(),
        sale.total(),
        config,
    );
    let _ = writeln!(out, "Paid by {}", sale.payment_method);
    let _ = writeln!(out, "{}", RULE);
    out.trim_end().to_string()
}

pub(super) fn sale_line(sale: &Sale, config: &AppConfig) -> String {
    format!(
        "{}  {}  {:>10}  {:<6}  {}",
        sale.receipt_number,
        sale.created_at.format("%Y-%m-%d %H:%M"),
        config.format_currency(sale.total()),
        sale.payment_method.to_string(),
        sale.cashier_username
    )
}

fn write_totals(
    out: &mut String,
    subtotal: Money,
    discount: Money,
    tax: Money,
    total: Money,
    config: &AppConfig,
) {
    let _ = writeln!(out, "{:<30} {:>10}", "Subtotal", config.format_currency(subtotal));
    if !discount.is_zero() {
        let _ = writeln!(out, "{:<30} {:>10}", "Discount", config.format_currency(Money::zero() - discount));
    }
    let _ = writeln!(
        out,
        "{:<30} {:>10}",
        format!("Tax ({}%)", config.tax_rate.percentage()),
        config.format_currency(tax)
    );
    let _ = writeln!(out, "{:<30} {:>10}", "TOTAL", config.format_currency(total));
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::TaxRate;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Cola", 10), "Cola");
        assert_eq!(truncate("Sparkling Water", 8), "Sparkli~");
    }

    #[test]
    fn test_empty_cart() {
        let config = AppConfig::default();
        let cart = Cart::new();
        assert_eq!(cart_text(&cart, &cart.totals(TaxRate::zero()), &config), "Cart is empty.");
    }

    #[test]
    fn test_totals_block() {
        let config = AppConfig {
            tax_rate: TaxRate::from_bps(800),
            ..AppConfig::default()
        };
        let mut out = String::new();
        write_totals(
            &mut out,
            Money::from_cents(2000),
            Money::from_cents(200),
            Money::from_cents(144),
            Money::from_cents(1944),
            &config,
        );
        assert!(out.contains("Discount"));
        assert!(out.contains("-$2.00"));
        assert!(out.contains("Tax (8%)"));
        assert!(out.contains("$19.44"));
    }
}
