//! In-memory [`CommerceApi`] used by unit tests.
//!
//! Behaves like the real server for the calls the storefront makes: adding a
//! product already in the cart bumps its quantity, totals are computed
//! server-side, placing an order empties the cart. Every call is counted and
//! any call can be made to fail once.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use cartwheel_core::{
    CartLine, CartLineId, CartSnapshot, CurrencyCode, Order, OrderId, OrderLine, OrderReceipt,
    Price, Product, ProductId, ProductPage,
};
use chrono::DateTime;
use rust_decimal::Decimal;

use crate::api::{ApiError, CartLineInput, CommerceApi, OrderInput, ProductQuery};

/// Coupon code the fake accepts, worth 10% off.
pub const COUPON: &str = "SAVE10";

const CURRENCY: CurrencyCode = CurrencyCode::TWD;

/// Build an enabled product with a whole-number price.
pub fn product(id: &str, title: &str, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        title: title.to_string(),
        category: "general".to_string(),
        unit: "piece".to_string(),
        origin_price: Price::new(Decimal::new(price, 0), CURRENCY),
        price: Price::new(Decimal::new(price, 0), CURRENCY),
        image_url: None,
        images: Vec::new(),
        description: String::new(),
        content: String::new(),
        is_enabled: true,
    }
}

/// Fake API operations, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListProducts,
    GetProduct,
    GetCart,
    AddToCart,
    UpdateCartLine,
    RemoveCartLine,
    ClearCart,
    ApplyCoupon,
    SubmitOrder,
    GetOrder,
    PayOrder,
}

/// Number of times each operation was called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calls {
    pub list_products: usize,
    pub get_product: usize,
    pub get_cart: usize,
    pub add_to_cart: usize,
    pub update_cart_line: usize,
    pub remove_cart_line: usize,
    pub clear_cart: usize,
    pub apply_coupon: usize,
    pub submit_order: usize,
    pub get_order: usize,
    pub pay_order: usize,
}

impl Calls {
    /// Calls that change server state.
    pub const fn mutations(&self) -> usize {
        self.add_to_cart
            + self.update_cart_line
            + self.remove_cart_line
            + self.clear_cart
            + self.apply_coupon
            + self.submit_order
            + self.pay_order
    }

    /// Every call, reads included.
    pub const fn total(&self) -> usize {
        self.mutations()
            + self.list_products
            + self.get_product
            + self.get_cart
            + self.get_order
    }
}

struct FakeLine {
    id: CartLineId,
    product_id: ProductId,
    quantity: u32,
}

#[derive(Default)]
struct State {
    products: Vec<Product>,
    lines: Vec<FakeLine>,
    next_line: u64,
    discount_percent: i64,
    orders: Vec<Order>,
    failures: HashSet<Op>,
    calls: Calls,
}

/// In-memory commerce server.
#[derive(Default)]
pub struct FakeCommerceApi {
    state: Mutex<State>,
}

impl FakeCommerceApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_product(&self, product: Product) {
        self.lock().products.push(product);
    }

    /// Make the next call of `op` fail with a 503.
    pub fn fail_next(&self, op: Op) {
        self.lock().failures.insert(op);
    }

    pub fn calls(&self) -> Calls {
        self.lock().calls
    }

    /// Server-side cart contents, bypassing call counting.
    pub fn server_cart(&self) -> CartSnapshot {
        build_cart(&self.lock())
    }

    /// Record a call and consume a pending failure for it.
    fn enter(&self, op: Op) -> Result<MutexGuard<'_, State>, ApiError> {
        let mut state = self.lock();
        let calls = &mut state.calls;
        match op {
            Op::ListProducts => calls.list_products += 1,
            Op::GetProduct => calls.get_product += 1,
            Op::GetCart => calls.get_cart += 1,
            Op::AddToCart => calls.add_to_cart += 1,
            Op::UpdateCartLine => calls.update_cart_line += 1,
            Op::RemoveCartLine => calls.remove_cart_line += 1,
            Op::ClearCart => calls.clear_cart += 1,
            Op::ApplyCoupon => calls.apply_coupon += 1,
            Op::SubmitOrder => calls.submit_order += 1,
            Op::GetOrder => calls.get_order += 1,
            Op::PayOrder => calls.pay_order += 1,
        }
        if state.failures.remove(&op) {
            return Err(ApiError::Status {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(state)
    }
}

fn build_cart(state: &State) -> CartSnapshot {
    let mut lines = Vec::new();
    let mut subtotal = Decimal::ZERO;
    let mut final_total = Decimal::ZERO;

    for line in &state.lines {
        let Some(product) = state.products.iter().find(|p| p.id == line.product_id) else {
            continue;
        };
        let total = product.price.amount * Decimal::from(line.quantity);
        let discounted = total * Decimal::new(100 - state.discount_percent, 2);
        subtotal += total;
        final_total += discounted;
        lines.push(CartLine {
            id: line.id.clone(),
            product: product.clone(),
            quantity: line.quantity,
            total: Price::new(total, CURRENCY),
            final_total: Price::new(discounted, CURRENCY),
        });
    }

    CartSnapshot {
        lines,
        subtotal: Price::new(subtotal, CURRENCY),
        final_total: Price::new(final_total, CURRENCY),
    }
}

#[async_trait]
impl CommerceApi for FakeCommerceApi {
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let state = self.enter(Op::ListProducts)?;
        let products = state
            .products
            .iter()
            .filter(|p| query.category.as_ref().is_none_or(|c| &p.category == c))
            .cloned()
            .collect();
        Ok(ProductPage {
            products,
            pagination: cartwheel_core::Pagination {
                total_pages: 1,
                current_page: 1,
                ..Default::default()
            },
        })
    }

    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let state = self.enter(Op::GetProduct)?;
        state
            .products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("product/{id}")))
    }

    async fn get_cart(&self) -> Result<CartSnapshot, ApiError> {
        let state = self.enter(Op::GetCart)?;
        Ok(build_cart(&state))
    }

    async fn add_to_cart(&self, line: &CartLineInput) -> Result<(), ApiError> {
        let mut state = self.enter(Op::AddToCart)?;
        if !state.products.iter().any(|p| p.id == line.product_id) {
            return Err(ApiError::Rejected("unknown product".to_string()));
        }
        if let Some(existing) = state
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity += line.quantity;
            return Ok(());
        }
        state.next_line += 1;
        let id = CartLineId::new(state.next_line.to_string());
        state.lines.push(FakeLine {
            id,
            product_id: line.product_id.clone(),
            quantity: line.quantity,
        });
        Ok(())
    }

    async fn update_cart_line(
        &self,
        line_id: &CartLineId,
        line: &CartLineInput,
    ) -> Result<(), ApiError> {
        let mut state = self.enter(Op::UpdateCartLine)?;
        let existing = state
            .lines
            .iter_mut()
            .find(|l| &l.id == line_id)
            .ok_or_else(|| ApiError::NotFound(format!("cart/{line_id}")))?;
        existing.product_id = line.product_id.clone();
        existing.quantity = line.quantity;
        Ok(())
    }

    async fn remove_cart_line(&self, line_id: &CartLineId) -> Result<(), ApiError> {
        let mut state = self.enter(Op::RemoveCartLine)?;
        state.lines.retain(|l| &l.id != line_id);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let mut state = self.enter(Op::ClearCart)?;
        state.lines.clear();
        state.discount_percent = 0;
        Ok(())
    }

    async fn apply_coupon(&self, code: &str) -> Result<(), ApiError> {
        let mut state = self.enter(Op::ApplyCoupon)?;
        if code != COUPON {
            return Err(ApiError::Rejected("coupon not found".to_string()));
        }
        state.discount_percent = 10;
        Ok(())
    }

    async fn submit_order(&self, order: &OrderInput) -> Result<OrderReceipt, ApiError> {
        let mut state = self.enter(Op::SubmitOrder)?;
        let cart = build_cart(&state);
        if cart.is_empty() {
            return Err(ApiError::Rejected("cart is empty".to_string()));
        }

        let created_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        let id = OrderId::new(format!("order-{}", state.orders.len() + 1));
        state.orders.push(Order {
            id: id.clone(),
            created_at,
            is_paid: false,
            total: cart.final_total,
            message: Some(order.message.clone()).filter(|m| !m.is_empty()),
            customer: order.user.clone(),
            lines: cart
                .lines
                .into_iter()
                .map(|l| OrderLine {
                    product: l.product,
                    quantity: l.quantity,
                    final_total: l.final_total,
                })
                .collect(),
        });
        state.lines.clear();
        state.discount_percent = 0;

        Ok(OrderReceipt {
            order_id: id,
            total: cart.final_total,
            created_at,
        })
    }

    async fn get_order(&self, id: &OrderId) -> Result<Order, ApiError> {
        let state = self.enter(Op::GetOrder)?;
        state
            .orders
            .iter()
            .find(|o| &o.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("order/{id}")))
    }

    async fn pay_order(&self, id: &OrderId) -> Result<(), ApiError> {
        let mut state = self.enter(Op::PayOrder)?;
        let order = state
            .orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("order/{id}")))?;
        order.is_paid = true;
        Ok(())
    }
}
