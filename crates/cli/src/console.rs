//! Terminal output.
//!
//! Rendering builds plain strings so it can be tested; only [`print`] and
//! [`error`] touch the terminal.

use std::fmt::Write as _;

use cartwheel_core::{CartSnapshot, Order, OrderReceipt, Product, ProductPage};
use cartwheel_storefront::error::add_breadcrumb;
use cartwheel_storefront::{Notification, Notifier};

/// Prints notifications to stderr and leaves a Sentry breadcrumb for each.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    #[allow(clippy::print_stderr)]
    fn notify(&self, notification: Notification) {
        eprintln!("{notification}");
        add_breadcrumb("notification", &notification.message, None);
    }
}

#[allow(clippy::print_stdout)]
pub fn print(text: &str) {
    print!("{text}");
}

#[allow(clippy::print_stderr)]
pub fn error(message: &str) {
    eprintln!("error: {message}");
}

pub fn product_page(page: &ProductPage) -> String {
    let mut out = String::new();
    if page.products.is_empty() {
        out.push_str("No products.\n");
        return out;
    }

    for product in &page.products {
        let sale = if product.is_on_sale() {
            format!(" (was {})", product.origin_price)
        } else {
            String::new()
        };
        let _ = writeln!(
            out,
            "{:>8}  {:<32} {:>12}{sale}",
            product.id, product.title, product.price
        );
    }

    let p = &page.pagination;
    let _ = writeln!(out, "\npage {} of {}", p.current_page, p.total_pages);
    out
}

pub fn product(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", product.title, product.id);
    let _ = writeln!(out, "category: {} / unit: {}", product.category, product.unit);
    if product.is_on_sale() {
        let _ = writeln!(out, "price: {} (was {})", product.price, product.origin_price);
    } else {
        let _ = writeln!(out, "price: {}", product.price);
    }
    if let Some(url) = &product.image_url {
        let _ = writeln!(out, "image: {url}");
    }
    if !product.description.is_empty() {
        let _ = writeln!(out, "\n{}", product.description);
    }
    if !product.content.is_empty() {
        let _ = writeln!(out, "\n{}", product.content);
    }
    out
}

pub fn cart(cart: &CartSnapshot) -> String {
    let mut out = String::new();
    if cart.is_empty() {
        out.push_str("Cart is empty.\n");
        return out;
    }

    for line in &cart.lines {
        let _ = writeln!(
            out,
            "{:>6}  {:<32} x{:<4} {:>12}",
            line.id, line.product.title, line.quantity, line.total
        );
    }
    let _ = writeln!(out, "\nsubtotal: {}", cart.subtotal);
    if cart.has_discount() {
        let _ = writeln!(out, "total after discount: {}", cart.final_total);
    }
    out
}

pub fn receipt(receipt: &OrderReceipt) -> String {
    format!(
        "order {} placed {} for {}\n",
        receipt.order_id,
        receipt.created_at.format("%Y-%m-%d %H:%M UTC"),
        receipt.total
    )
}

pub fn order(order: &Order) -> String {
    let mut out = String::new();
    let status = if order.is_paid { "paid" } else { "unpaid" };
    let _ = writeln!(
        out,
        "order {} ({status}) placed {}",
        order.id,
        order.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        out,
        "ship to: {} <{}> {}, {}",
        order.customer.name, order.customer.email, order.customer.tel, order.customer.address
    );
    for line in &order.lines {
        let _ = writeln!(
            out,
            "  {:<32} x{:<4} {:>12}",
            line.product.title, line.quantity, line.final_total
        );
    }
    let _ = writeln!(out, "total: {}", order.total);
    if let Some(message) = &order.message {
        let _ = writeln!(out, "note: {message}");
    }
    out
}

#[cfg(test)]
mod tests {
    use cartwheel_core::{
        CartLine, CartLineId, CurrencyCode, Pagination, Price, ProductId,
    };
    use rust_decimal::Decimal;

    use super::*;

    fn twd(amount: i64) -> Price {
        Price::new(Decimal::new(amount, 0), CurrencyCode::TWD)
    }

    fn widget() -> Product {
        Product {
            id: ProductId::new("42"),
            title: "Widget".to_string(),
            category: "tools".to_string(),
            unit: "piece".to_string(),
            origin_price: twd(120),
            price: twd(100),
            image_url: None,
            images: Vec::new(),
            description: "A widget.".to_string(),
            content: String::new(),
            is_enabled: true,
        }
    }

    #[test]
    fn test_empty_cart() {
        assert_eq!(cart(&CartSnapshot::empty(CurrencyCode::TWD)), "Cart is empty.\n");
    }

    #[test]
    fn test_cart_lists_lines_and_discount() {
        let snapshot = CartSnapshot {
            lines: vec![CartLine {
                id: CartLineId::new("1"),
                product: widget(),
                quantity: 2,
                total: twd(200),
                final_total: twd(180),
            }],
            subtotal: twd(200),
            final_total: twd(180),
        };

        let text = cart(&snapshot);
        assert!(text.contains("Widget"));
        assert!(text.contains("x2"));
        assert!(text.contains("subtotal: NT$200"));
        assert!(text.contains("total after discount: NT$180"));
    }

    #[test]
    fn test_product_shows_sale_price() {
        let text = product(&widget());
        assert!(text.starts_with("Widget [42]"));
        assert!(text.contains("price: NT$100 (was NT$120)"));
    }

    #[test]
    fn test_product_page_footer() {
        let page = ProductPage {
            products: vec![widget()],
            pagination: Pagination {
                total_pages: 3,
                current_page: 2,
                has_previous: true,
                has_next: true,
                category: None,
            },
        };
        assert!(product_page(&page).ends_with("page 2 of 3\n"));
    }
}
