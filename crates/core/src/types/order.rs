//! Order types returned after checkout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::customer::Customer;
use super::id::OrderId;
use super::price::Price;
use super::product::Product;

/// Confirmation returned when an order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// ID of the new order.
    pub order_id: OrderId,
    /// Amount charged for the order.
    pub total: Price,
    /// When the server created the order.
    pub created_at: DateTime<Utc>,
}

/// One product line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: Product,
    pub quantity: u32,
    pub final_total: Price,
}

/// A placed order as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub is_paid: bool,
    pub total: Price,
    pub message: Option<String>,
    pub customer: Customer,
    pub lines: Vec<OrderLine>,
}
