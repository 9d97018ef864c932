//! Catalog product types.
//!
//! Products are read-only on the client: they are fetched from the catalog
//! and embedded in cart lines, never edited locally.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog product ID.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Category used for filtering listings.
    pub category: String,
    /// Sales unit (e.g., "box", "piece").
    pub unit: String,
    /// List price before any sale.
    pub origin_price: Price,
    /// Current selling price.
    pub price: Price,
    /// Primary image URL.
    pub image_url: Option<String>,
    /// Additional image URLs.
    pub images: Vec<String>,
    /// Short description.
    pub description: String,
    /// Long-form content shown on the detail view.
    pub content: String,
    /// Whether the product is currently sold.
    pub is_enabled: bool,
}

impl Product {
    /// Whether the selling price is below the list price.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.price.amount < self.origin_price.amount
    }
}

/// Pagination metadata for a product listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Total number of pages.
    pub total_pages: u32,
    /// 1-based current page.
    pub current_page: u32,
    /// Whether a previous page exists.
    pub has_previous: bool,
    /// Whether a next page exists.
    pub has_next: bool,
    /// Category filter the page was built for.
    pub category: Option<String>,
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}
