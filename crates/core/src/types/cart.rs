//! Cart snapshot types.
//!
//! A [`CartSnapshot`] is a reflection of the server-side cart. It is never
//! patched in place: every successful refresh produces a whole new snapshot,
//! and the totals it carries are the server's, never recomputed locally.

use serde::{Deserialize, Serialize};

use super::id::{CartLineId, ProductId};
use super::price::{CurrencyCode, Price};
use super::product::Product;

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Cart line ID (distinct from the product ID).
    pub id: CartLineId,
    /// The product this line holds.
    pub product: Product,
    /// Quantity, always at least 1.
    pub quantity: u32,
    /// Line total before discounts.
    pub total: Price,
    /// Line total after discounts.
    pub final_total: Price,
}

impl CartLine {
    /// ID of the product held by this line.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }
}

/// Server-authoritative view of the whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Cart lines, in server order.
    pub lines: Vec<CartLine>,
    /// Sum of line totals as reported by the server.
    pub subtotal: Price,
    /// Total after discounts as reported by the server.
    pub final_total: Price,
}

impl CartSnapshot {
    /// An empty cart with zero totals.
    #[must_use]
    pub const fn empty(currency: CurrencyCode) -> Self {
        Self {
            lines: Vec::new(),
            subtotal: Price::zero(currency),
            final_total: Price::zero(currency),
        }
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Look up a line by its ID.
    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.id == id)
    }

    /// Look up the line holding a product.
    #[must_use]
    pub fn line_for_product(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id() == product_id)
    }

    /// Total number of items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Whether the server applied a discount to this cart.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.final_total.amount < self.subtotal.amount
    }
}
