//! Order placement.
//!
//! Placing an order consumes the server-side cart. After a successful
//! submission the cart view is refreshed so the snapshot comes back empty;
//! after a failed one the local cart is left alone.

use std::sync::Arc;

use cartwheel_core::{CustomerForm, CustomerValidator, Order, OrderId, OrderReceipt};
use tracing::{info, instrument, warn};

use crate::api::{CommerceApi, OrderInput};
use crate::cart::CartSynchronizer;
use crate::error::{Result, StoreError};

/// An order the server accepted.
#[derive(Debug)]
pub struct PlacedOrder {
    pub receipt: OrderReceipt,
    /// Set when the cart could not be re-read after the order; the snapshot
    /// still shows the ordered lines.
    pub stale_cart: Option<StoreError>,
}

/// Validates checkout details and places orders.
pub struct OrderSubmitter {
    api: Arc<dyn CommerceApi>,
    validator: Arc<dyn CustomerValidator>,
}

impl OrderSubmitter {
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, validator: Arc<dyn CustomerValidator>) -> Self {
        Self { api, validator }
    }

    /// Place an order for everything in `cart`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` without a network call if the customer
    /// details are invalid or the cart is empty, and `StoreError::Fetch` if the
    /// order is refused or fails in transit. A failed submission never clears
    /// the cart. If the order went through but the follow-up refresh failed,
    /// the order is still returned with the failure in
    /// [`PlacedOrder::stale_cart`].
    #[instrument(skip(self, cart, form, message))]
    pub async fn submit_order(
        &self,
        cart: &CartSynchronizer,
        form: &CustomerForm,
        message: &str,
    ) -> Result<PlacedOrder> {
        let customer = self.validator.validate(form)?;

        if cart.snapshot().is_empty() {
            return Err(StoreError::Validation("cart is empty".to_string()));
        }

        let input = OrderInput {
            user: customer,
            message: message.trim().to_string(),
        };
        let receipt = self.api.submit_order(&input).await.map_err(|e| {
            warn!(error = %e, "Order submission failed; cart kept");
            StoreError::Fetch(e)
        })?;

        info!(
            order_id = %receipt.order_id,
            total = %receipt.total,
            "Order placed"
        );

        let stale_cart = cart.refresh().await.err();
        if let Some(e) = &stale_cart {
            warn!(error = %e, "Cart refresh after order failed; cart view is stale");
        }

        Ok(PlacedOrder {
            receipt,
            stale_cart,
        })
    }

    /// Look up a placed order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown order and
    /// `StoreError::Fetch` for transport or server failures.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: &OrderId) -> Result<Order> {
        if id.is_blank() {
            return Err(StoreError::Validation("order ID is required".to_string()));
        }
        self.api.get_order(id).await.map_err(StoreError::from_lookup)
    }

    /// Mark an order as paid and return it as the server now reports it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown order and
    /// `StoreError::Fetch` for transport or server failures.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn pay_order(&self, id: &OrderId) -> Result<Order> {
        if id.is_blank() {
            return Err(StoreError::Validation("order ID is required".to_string()));
        }
        self.api.pay_order(id).await.map_err(StoreError::from_lookup)?;
        info!("Order paid");
        self.get_order(id).await
    }
}
