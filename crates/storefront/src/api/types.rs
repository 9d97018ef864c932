//! Request inputs for the commerce API.

use cartwheel_core::{Customer, ProductId};
use serde::Serialize;

/// A product and quantity to put in the cart.
///
/// Serializes to the wire shape `{"product_id": ..., "qty": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineInput {
    pub product_id: ProductId,
    #[serde(rename = "qty")]
    pub quantity: u32,
}

/// Customer details and note attached to a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderInput {
    pub user: Customer,
    pub message: String,
}

/// Filters for a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// 1-based page, server default when `None`.
    pub page: Option<u32>,
    /// Category filter, all categories when `None`.
    pub category: Option<String>,
}

impl ProductQuery {
    /// Query string pairs for the request.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            pairs.push(("category", category.to_string()));
        }
        pairs
    }
}
