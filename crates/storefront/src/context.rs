//! Store context: the one object a front end talks to.
//!
//! `StoreContext` owns the cart synchronizer, the product catalog and the
//! order submitter. Front ends read state through projections such as
//! [`StoreContext::cart`] and change it only by dispatching an [`Action`].
//! `dispatch` never returns an error: failures are reported to the
//! [`Notifier`] and come back as [`Outcome::Failed`].

use std::sync::Arc;
use std::time::Duration;

use cartwheel_core::{
    BasicCustomerValidator, CartLineId, CartSnapshot, CurrencyCode, CustomerForm,
    CustomerValidator, Order, OrderId, Product, ProductId, ProductPage,
};
use tracing::{debug, instrument};

use crate::api::{ApiError, CommerceApi, CommerceClient, ProductQuery};
use crate::cart::CartSynchronizer;
use crate::catalog::ProductCatalog;
use crate::config::StorefrontConfig;
use crate::error::{Result, StoreError, add_breadcrumb};
use crate::notify::{Notification, Notifier};
use crate::order::{OrderSubmitter, PlacedOrder};

/// Something the user asked the store to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ListProducts { query: ProductQuery },
    ShowProduct(ProductId),
    RefreshCart,
    AddItem {
        product_id: Option<ProductId>,
        quantity: u32,
    },
    UpdateQuantity {
        line_id: CartLineId,
        quantity: u32,
    },
    Increment(CartLineId),
    Decrement(CartLineId),
    RemoveItem(CartLineId),
    ClearCart,
    ApplyCoupon(String),
    Checkout { form: CustomerForm, message: String },
    GetOrder(OrderId),
    PayOrder(OrderId),
}

impl Action {
    /// Short name used in logs and breadcrumbs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ListProducts { .. } => "list_products",
            Self::ShowProduct(_) => "show_product",
            Self::RefreshCart => "refresh_cart",
            Self::AddItem { .. } => "add_item",
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::Increment(_) => "increment",
            Self::Decrement(_) => "decrement",
            Self::RemoveItem(_) => "remove_item",
            Self::ClearCart => "clear_cart",
            Self::ApplyCoupon(_) => "apply_coupon",
            Self::Checkout { .. } => "checkout",
            Self::GetOrder(_) => "get_order",
            Self::PayOrder(_) => "pay_order",
        }
    }
}

/// Result of a dispatched action.
#[derive(Debug)]
pub enum Outcome {
    Products(ProductPage),
    Product(Box<Product>),
    Cart(Arc<CartSnapshot>),
    Ordered(PlacedOrder),
    Order(Box<Order>),
    /// A mutation for the same product was already in flight.
    Ignored,
    /// The action failed; the user has been notified.
    Failed(StoreError),
}

impl Outcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Shared store state. Cheap to clone.
#[derive(Clone)]
pub struct StoreContext {
    inner: Arc<StoreContextInner>,
}

struct StoreContextInner {
    cart: CartSynchronizer,
    catalog: ProductCatalog,
    orders: OrderSubmitter,
    notifier: Arc<dyn Notifier>,
}

impl StoreContext {
    /// Build a context talking to the configured commerce API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: &StorefrontConfig,
        notifier: Arc<dyn Notifier>,
    ) -> std::result::Result<Self, ApiError> {
        let client = CommerceClient::new(&config.api, config.currency)?;
        Ok(Self::new(
            Arc::new(client),
            config.currency,
            config.catalog_cache_ttl,
            Arc::new(BasicCustomerValidator),
            notifier,
        ))
    }

    /// Build a context over any [`CommerceApi`].
    #[must_use]
    pub fn new(
        api: Arc<dyn CommerceApi>,
        currency: CurrencyCode,
        catalog_cache_ttl: Duration,
        validator: Arc<dyn CustomerValidator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreContextInner {
                cart: CartSynchronizer::new(Arc::clone(&api), currency),
                catalog: ProductCatalog::new(Arc::clone(&api), catalog_cache_ttl),
                orders: OrderSubmitter::new(api, validator),
                notifier,
            }),
        }
    }

    /// The current cart snapshot.
    #[must_use]
    pub fn cart(&self) -> Arc<CartSnapshot> {
        self.inner.cart.snapshot()
    }

    /// Whether a cart mutation for the product is in flight.
    #[must_use]
    pub fn is_busy(&self, product_id: &ProductId) -> bool {
        self.inner.cart.is_busy(product_id)
    }

    /// Read-only access to the catalog.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    /// Perform an action, reporting any failure to the notifier.
    #[instrument(skip(self, action), fields(action = action.name()))]
    pub async fn dispatch(&self, action: Action) -> Outcome {
        if self.is_duplicate(&action) {
            debug!("Ignoring action for busy product");
            return Outcome::Ignored;
        }

        add_breadcrumb("action", action.name(), None);
        let confirmation = confirmation(&action);

        match self.run(action).await {
            Ok(outcome) => {
                if let Some(message) = confirmation {
                    self.inner.notifier.notify(Notification::info(message));
                }
                if let Outcome::Ordered(PlacedOrder {
                    stale_cart: Some(err),
                    ..
                }) = &outcome
                {
                    self.inner.notifier.notify(Notification::stale_cart(err));
                }
                outcome
            }
            Err(err) => {
                self.inner.notifier.notify_error(&err);
                Outcome::Failed(err)
            }
        }
    }

    /// A cart mutation for a product that already has one in flight.
    fn is_duplicate(&self, action: &Action) -> bool {
        let cart = &self.inner.cart;
        match action {
            Action::AddItem {
                product_id: Some(id),
                ..
            } => cart.is_busy(id),
            Action::UpdateQuantity { line_id, .. }
            | Action::Increment(line_id)
            | Action::Decrement(line_id) => cart
                .snapshot()
                .line(line_id)
                .is_some_and(|line| cart.is_busy(line.product_id())),
            _ => false,
        }
    }

    async fn run(&self, action: Action) -> Result<Outcome> {
        let StoreContextInner {
            cart,
            catalog,
            orders,
            ..
        } = &*self.inner;

        let outcome = match action {
            Action::ListProducts { query } => {
                Outcome::Products(catalog.list_products_page(query).await?)
            }
            Action::ShowProduct(id) => Outcome::Product(Box::new(catalog.get_product(&id).await?)),
            Action::RefreshCart => Outcome::Cart(cart.refresh().await?),
            Action::AddItem {
                product_id,
                quantity,
            } => Outcome::Cart(cart.add_item(product_id.as_ref(), quantity).await?),
            Action::UpdateQuantity { line_id, quantity } => {
                Outcome::Cart(cart.update_quantity(&line_id, quantity).await?)
            }
            Action::Increment(line_id) => Outcome::Cart(cart.increment(&line_id).await?),
            Action::Decrement(line_id) => Outcome::Cart(cart.decrement(&line_id).await?),
            Action::RemoveItem(line_id) => Outcome::Cart(cart.remove_item(&line_id).await?),
            Action::ClearCart => Outcome::Cart(cart.clear().await?),
            Action::ApplyCoupon(code) => Outcome::Cart(cart.apply_coupon(&code).await?),
            Action::Checkout { form, message } => {
                Outcome::Ordered(orders.submit_order(cart, &form, &message).await?)
            }
            Action::GetOrder(id) => Outcome::Order(Box::new(orders.get_order(&id).await?)),
            Action::PayOrder(id) => Outcome::Order(Box::new(orders.pay_order(&id).await?)),
        };

        Ok(outcome)
    }
}

/// Message shown after an action succeeds, if any.
fn confirmation(action: &Action) -> Option<&'static str> {
    match action {
        Action::AddItem { .. } => Some("Added to cart"),
        Action::UpdateQuantity { .. } | Action::Increment(_) | Action::Decrement(_) => {
            Some("Cart updated")
        }
        Action::RemoveItem(_) => Some("Removed from cart"),
        Action::ClearCart => Some("Cart cleared"),
        Action::ApplyCoupon(_) => Some("Coupon applied"),
        Action::Checkout { .. } => Some("Order placed"),
        Action::PayOrder(_) => Some("Payment received"),
        Action::ListProducts { .. }
        | Action::ShowProduct(_)
        | Action::RefreshCart
        | Action::GetOrder(_) => None,
    }
}
