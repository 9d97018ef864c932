//! `reqwest` implementation of [`CommerceApi`].

use std::sync::Arc;

use async_trait::async_trait;
use cartwheel_core::{
    CartLineId, CartSnapshot, CurrencyCode, Order, OrderId, OrderReceipt, Product, ProductId,
    ProductPage,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, instrument};
use url::Url;

use super::conversions::{
    convert_cart, convert_order, convert_product, convert_product_page, convert_receipt,
};
use super::types::{CartLineInput, OrderInput, ProductQuery};
use super::wire::{
    CartResponse, CouponBody, DataEnvelope, OrderCreatedResponse, OrderResponse, ProductResponse,
    ProductsResponse, Status, message_text,
};
use super::{ApiError, CommerceApi};
use crate::config::CommerceApiConfig;

/// Longest slice of a response body copied into logs and errors.
const BODY_LOG_LIMIT: usize = 500;

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    endpoint: Url,
    currency: CurrencyCode,
}

impl CommerceClient {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value, the endpoint
    /// is not a usable URL, or the HTTP client fails to build.
    pub fn new(config: &CommerceApiConfig, currency: CurrencyCode) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(token.expose_secret())
                .map_err(|e| ApiError::Config(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let endpoint = Url::parse(&config.endpoint())
            .map_err(|e| ApiError::Config(format!("Invalid API endpoint: {e}")))?;
        if endpoint.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "API endpoint cannot take a path: {endpoint}"
            )));
        }

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                endpoint,
                currency,
            }),
        })
    }

    /// Root URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.inner.endpoint.as_str()
    }

    /// Append `segments` to the endpoint, each escaped as exactly one path
    /// segment.
    ///
    /// `Url` drops `.` and `..` segments, so those are refused.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        if let Some(bad) = segments
            .iter()
            .find(|s| matches!(**s, "" | "." | ".."))
        {
            return Err(ApiError::InvalidId(format!("{bad:?}")));
        }

        let mut url = self.inner.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Config("API endpoint cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and decode the payload of a successful response.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;
        let snippet = || response_text.chars().take(BODY_LOG_LIMIT).collect::<String>();

        // The body of a failed response usually still carries a message
        let reported = serde_json::from_str::<Status>(&response_text).ok();
        let reported_message = reported
            .as_ref()
            .and_then(|s| message_text(s.message.as_ref()));

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(
                reported_message.unwrap_or_else(|| path.to_string()),
            ));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                path,
                body = %snippet(),
                "Commerce API returned non-success status"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: reported_message.unwrap_or_else(snippet),
            });
        }

        match reported {
            Some(s) if !s.success => {
                tracing::warn!(path, body = %snippet(), "Commerce API rejected request");
                return Err(ApiError::Rejected(
                    reported_message.unwrap_or_else(|| "request rejected".to_string()),
                ));
            }
            Some(_) => {}
            None => {
                tracing::error!(path, body = %snippet(), "Commerce API response is not JSON");
            }
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %snippet(),
                "Failed to parse commerce API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let request = self.inner.client.get(self.url(segments)?);
        self.execute(request, &segments.join("/")).await
    }

    async fn send_data<B: serde::Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self
            .inner
            .client
            .request(method, self.url(segments)?)
            .json(&DataEnvelope { data: body });
        self.execute(request, &segments.join("/")).await
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
        let request = self.inner.client.delete(self.url(segments)?);
        self.execute::<IgnoredAny>(request, &segments.join("/")).await?;
        Ok(())
    }
}

#[async_trait]
impl CommerceApi for CommerceClient {
    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let request = self
            .inner
            .client
            .get(self.url(&["products"])?)
            .query(&query.to_pairs());
        let data: ProductsResponse = self.execute(request, "products").await?;
        debug!(count = data.products.len(), "Fetched product page");
        Ok(convert_product_page(data, self.inner.currency))
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let data: ProductResponse = self.get(&["product", id.as_str()]).await?;
        Ok(convert_product(data.product, self.inner.currency))
    }

    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<CartSnapshot, ApiError> {
        let data: CartResponse = self.get(&["cart"]).await?;
        Ok(convert_cart(data.data, self.inner.currency))
    }

    #[instrument(skip(self), fields(product_id = %line.product_id, qty = line.quantity))]
    async fn add_to_cart(&self, line: &CartLineInput) -> Result<(), ApiError> {
        self.send_data::<_, IgnoredAny>(reqwest::Method::POST, &["cart"], line)
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(line_id = %line_id, qty = line.quantity))]
    async fn update_cart_line(
        &self,
        line_id: &CartLineId,
        line: &CartLineInput,
    ) -> Result<(), ApiError> {
        self.send_data::<_, IgnoredAny>(
            reqwest::Method::PUT,
            &["cart", line_id.as_str()],
            line,
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(line_id = %line_id))]
    async fn remove_cart_line(&self, line_id: &CartLineId) -> Result<(), ApiError> {
        self.delete(&["cart", line_id.as_str()]).await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.delete(&["carts"]).await
    }

    #[instrument(skip(self))]
    async fn apply_coupon(&self, code: &str) -> Result<(), ApiError> {
        self.send_data::<_, IgnoredAny>(reqwest::Method::POST, &["coupon"], &CouponBody { code })
            .await?;
        Ok(())
    }

    #[instrument(skip(self, order))]
    async fn submit_order(&self, order: &OrderInput) -> Result<OrderReceipt, ApiError> {
        let data: OrderCreatedResponse = self
            .send_data(reqwest::Method::POST, &["order"], order)
            .await?;
        convert_receipt(data, self.inner.currency)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let data: OrderResponse = self.get(&["order", id.as_str()]).await?;
        convert_order(data.order, self.inner.currency)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn pay_order(&self, id: &OrderId) -> Result<(), ApiError> {
        let request = self.inner.client.post(self.url(&["pay", id.as_str()])?);
        self.execute::<IgnoredAny>(request, "pay").await?;
        Ok(())
    }
}
