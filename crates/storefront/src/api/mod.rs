//! Commerce REST API client.
//!
//! # Architecture
//!
//! - [`CommerceApi`] is the seam between the storefront logic and the wire.
//!   The cart synchronizer, catalog and order submitter only ever talk to this
//!   trait, so they can be exercised against an in-memory fake.
//! - [`CommerceClient`] is the `reqwest` implementation.
//! - The server is the source of truth - nothing here caches cart state.
//!
//! # Endpoints
//!
//! All paths are relative to `{base_url}/{api_version}/api/{api_path}`:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | list products | `GET /products` |
//! | product detail | `GET /product/{id}` |
//! | read cart | `GET /cart` |
//! | add line | `POST /cart` |
//! | update line | `PUT /cart/{line_id}` |
//! | remove line | `DELETE /cart/{line_id}` |
//! | clear cart | `DELETE /carts` |
//! | apply coupon | `POST /coupon` |
//! | place order | `POST /order` |
//! | read order | `GET /order/{id}` |
//! | pay order | `POST /pay/{id}` |

mod client;
mod conversions;
pub mod types;
mod wire;

pub use client::CommerceClient;
pub use types::{CartLineInput, OrderInput, ProductQuery};

use async_trait::async_trait;
use cartwheel_core::{
    CartLineId, CartSnapshot, Order, OrderId, OrderReceipt, Product, ProductId, ProductPage,
};
use thiserror::Error;

/// Errors that can occur when talking to the commerce API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Server answered but reported `success: false`.
    #[error("Rejected by server: {0}")]
    Rejected(String),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An ID cannot be sent as a single URL path segment.
    #[error("Invalid identifier in request path: {0}")]
    InvalidId(String),

    /// Response parsed but held impossible values.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be configured.
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether the error means the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Operations offered by the remote commerce API.
#[async_trait]
pub trait CommerceApi: Send + Sync {
    /// List one page of products.
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError>;

    /// Fetch a single product.
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError>;

    /// Read the current cart.
    async fn get_cart(&self) -> Result<CartSnapshot, ApiError>;

    /// Add a product to the cart.
    async fn add_to_cart(&self, line: &CartLineInput) -> Result<(), ApiError>;

    /// Set the quantity of an existing cart line.
    async fn update_cart_line(
        &self,
        line_id: &CartLineId,
        line: &CartLineInput,
    ) -> Result<(), ApiError>;

    /// Remove one cart line.
    async fn remove_cart_line(&self, line_id: &CartLineId) -> Result<(), ApiError>;

    /// Remove every cart line.
    async fn clear_cart(&self) -> Result<(), ApiError>;

    /// Apply a coupon code to the cart.
    async fn apply_coupon(&self, code: &str) -> Result<(), ApiError>;

    /// Place an order for the current cart.
    async fn submit_order(&self, order: &OrderInput) -> Result<OrderReceipt, ApiError>;

    /// Fetch a placed order.
    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError>;

    /// Mark a placed order as paid.
    async fn pay_order(&self, id: &OrderId) -> Result<(), ApiError>;
}
