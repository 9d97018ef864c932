//! Response shapes as the commerce API sends them.
//!
//! Every response carries a `success` flag and usually a `message`; the
//! payload sits in endpoint-specific fields next to them.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Fields common to every response.
#[derive(Debug, Deserialize)]
pub struct Status {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

const fn default_true() -> bool {
    true
}

/// Request body envelope: every write is sent as `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataEnvelope<'a, T: Serialize> {
    pub data: &'a T,
}

/// Coupon request body.
#[derive(Debug, Serialize)]
pub struct CouponBody<'a> {
    pub code: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductData>,
    #[serde(default)]
    pub pagination: Option<PaginationData>,
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    pub product: ProductData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit: String,
    pub origin_price: Decimal,
    pub price: Decimal,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(rename = "imagesUrl", default)]
    pub images_url: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_true", deserialize_with = "bool_or_int")]
    pub is_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PaginationData {
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub has_pre: bool,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CartResponse {
    pub data: CartData,
}

#[derive(Debug, Deserialize)]
pub struct CartData {
    #[serde(default)]
    pub carts: Vec<CartLineData>,
    pub total: Decimal,
    pub final_total: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CartLineData {
    pub id: String,
    pub product: ProductData,
    pub qty: u32,
    pub total: Decimal,
    pub final_total: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct OrderCreatedResponse {
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub total: Decimal,
    pub create_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderResponse {
    pub order: OrderData,
}

#[derive(Debug, Deserialize)]
pub struct OrderData {
    pub id: String,
    pub create_at: i64,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub total: Decimal,
    pub user: UserData,
    #[serde(default)]
    pub products: BTreeMap<String, CartLineData>,
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub name: String,
    pub email: String,
    pub tel: String,
    pub address: String,
}

/// Render a `message` field, which is a string or a list of strings.
pub fn message_text(message: Option<&serde_json::Value>) -> Option<String> {
    match message? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Accept `true`/`false` as well as `1`/`0`.
fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
