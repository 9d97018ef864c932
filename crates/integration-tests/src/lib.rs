//! Integration test support for Cartwheel.
//!
//! [`FakeCommerceServer`] is an in-process `axum` server that speaks the
//! commerce REST API on an ephemeral port. Tests point the real
//! `CommerceClient` at it, so requests go through `reqwest`, JSON encoding and
//! response parsing exactly as in production.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartwheel-integration-tests
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use cartwheel_core::{BasicCustomerValidator, CurrencyCode};
use cartwheel_storefront::{BufferedNotifier, CommerceApiConfig, CommerceClient, StoreContext};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use url::Url;

/// Store path the fake server is mounted under.
pub const API_PATH: &str = "test-shop";

/// Coupon code the fake server accepts, worth 10% off.
pub const COUPON: &str = "SAVE10";

/// Products per listing page.
pub const PAGE_SIZE: usize = 10;

/// Timestamp stamped on every order.
pub const ORDER_CREATED_AT: i64 = 1_700_000_000;

/// Endpoints of the fake server, used for counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
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

/// A product the fake server sells.
#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub id: String,
    pub title: String,
    pub category: String,
    pub origin_price: i64,
    pub price: i64,
    pub is_enabled: bool,
}

impl FakeProduct {
    #[must_use]
    pub fn new(id: &str, title: &str, price: i64) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            category: "general".to_string(),
            origin_price: price,
            price,
            is_enabled: true,
        }
    }

    #[must_use]
    pub fn in_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    #[must_use]
    pub const fn on_sale_from(mut self, origin_price: i64) -> Self {
        self.origin_price = origin_price;
        self
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "category": self.category,
            "unit": "piece",
            "origin_price": self.origin_price,
            "price": self.price,
            "imageUrl": format!("https://img.example.com/{}.png", self.id),
            "imagesUrl": ["", format!("https://img.example.com/{}-2.png", self.id)],
            "description": format!("About {}", self.title),
            "content": "",
            "is_enabled": i32::from(self.is_enabled),
        })
    }
}

struct Line {
    id: String,
    product_id: String,
    qty: u32,
}

struct PlacedOrder {
    id: String,
    is_paid: bool,
    message: String,
    user: Value,
    lines: Vec<Value>,
    total: i64,
}

#[derive(Default)]
struct Inner {
    products: Vec<FakeProduct>,
    lines: Vec<Line>,
    next_line: u64,
    discount_percent: i64,
    orders: Vec<PlacedOrder>,
    failures: HashSet<Route>,
    counts: HashMap<Route, usize>,
    authorization: Option<String>,
    cart_delays: Vec<Duration>,
}

impl Inner {
    fn product(&self, id: &str) -> Option<&FakeProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    fn line_total(&self, line: &Line) -> Option<(i64, i64)> {
        let product = self.product(&line.product_id)?;
        let total = product.price * i64::from(line.qty);
        Some((total, total * (100 - self.discount_percent) / 100))
    }

    fn line_json(&self, line: &Line) -> Option<Value> {
        let product = self.product(&line.product_id)?;
        let (total, final_total) = self.line_total(line)?;
        Some(json!({
            "id": line.id,
            "product_id": line.product_id,
            "qty": line.qty,
            "total": total,
            "final_total": final_total,
            "product": product.to_json(),
        }))
    }

    fn cart_json(&self) -> Value {
        let carts: Vec<Value> = self.lines.iter().filter_map(|l| self.line_json(l)).collect();
        let (total, final_total) = self
            .lines
            .iter()
            .filter_map(|l| self.line_total(l))
            .fold((0, 0), |(t, f), (lt, lf)| (t + lt, f + lf));
        json!({
            "carts": carts,
            "total": total,
            "final_total": final_total,
        })
    }
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Inner>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a request and consume a pending failure for its route.
    fn enter(&self, route: Route) -> Result<MutexGuard<'_, Inner>, Reject> {
        let mut inner = self.lock();
        *inner.counts.entry(route).or_default() += 1;
        if inner.failures.remove(&route) {
            return Err(Reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "injected failure".to_string(),
            ));
        }
        Ok(inner)
    }
}

/// Error response in the API's `{success: false, message}` shape.
struct Reject(StatusCode, String);

impl IntoResponse for Reject {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(json!({ "success": false, "message": self.1 })),
        )
            .into_response()
    }
}

type ApiResult = Result<Json<Value>, Reject>;

fn ok(message: &str) -> ApiResult {
    Ok(Json(json!({ "success": true, "message": message })))
}

/// In-process commerce API server.
pub struct FakeCommerceServer {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl FakeCommerceServer {
    /// Start a server on an ephemeral localhost port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake commerce server");
        let addr = listener
            .local_addr()
            .expect("Failed to read fake server address");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Client settings pointing at this server.
    ///
    /// # Panics
    ///
    /// Panics if the server address does not form a valid URL.
    #[must_use]
    pub fn api_config(&self) -> CommerceApiConfig {
        let base = Url::parse(&format!("http://{}", self.addr)).expect("Invalid fake server URL");
        CommerceApiConfig::new(base, API_PATH)
    }

    /// A real HTTP client pointing at this server.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> CommerceClient {
        CommerceClient::new(&self.api_config(), CurrencyCode::TWD)
            .expect("Failed to build commerce client")
    }

    /// A store context over a real client, with a notifier that buffers.
    #[must_use]
    pub fn store(&self) -> (StoreContext, Arc<BufferedNotifier>) {
        let notifier = Arc::new(BufferedNotifier::new());
        let store = StoreContext::new(
            Arc::new(self.client()),
            CurrencyCode::TWD,
            Duration::from_secs(60),
            Arc::new(BasicCustomerValidator),
            notifier.clone(),
        );
        (store, notifier)
    }

    pub fn add_product(&self, product: FakeProduct) {
        self.state.lock().products.push(product);
    }

    /// Make the next request to `route` answer 500.
    pub fn fail_next(&self, route: Route) {
        self.state.lock().failures.insert(route);
    }

    /// Requests received for `route`.
    #[must_use]
    pub fn count(&self, route: Route) -> usize {
        self.state.lock().counts.get(&route).copied().unwrap_or(0)
    }

    /// Requests received across all routes.
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.state.lock().counts.values().sum()
    }

    /// `Authorization` header of the most recent request.
    #[must_use]
    pub fn last_authorization(&self) -> Option<String> {
        self.state.lock().authorization.clone()
    }

    /// Delay the next `GET /cart` responses, one entry per request in order.
    pub fn delay_cart_reads(&self, delays: &[Duration]) {
        self.state.lock().cart_delays.extend_from_slice(delays);
    }

    /// Quantities currently in the server cart, by product ID.
    #[must_use]
    pub fn cart_quantities(&self) -> BTreeMap<String, u32> {
        self.state
            .lock()
            .lines
            .iter()
            .map(|l| (l.product_id.clone(), l.qty))
            .collect()
    }
}

impl Drop for FakeCommerceServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: Shared) -> Router {
    let api = Router::new()
        .route("/products", get(list_products))
        .route("/product/{id}", get(get_product))
        .route("/cart", get(get_cart).post(add_to_cart))
        .route("/cart/{id}", put(update_cart_line).delete(remove_cart_line))
        .route("/carts", delete(clear_cart))
        .route("/coupon", post(apply_coupon))
        .route("/order", post(submit_order))
        .route("/order/{id}", get(get_order))
        .route("/pay/{id}", post(pay_order))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            record_authorization,
        ))
        .with_state(state);

    Router::new().nest(&format!("/v2/api/{API_PATH}"), api)
}

async fn record_authorization(State(state): State<Shared>, request: Request, next: Next) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().authorization = header;
    next.run(request).await
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<usize>,
    category: Option<String>,
}

async fn list_products(State(state): State<Shared>, Query(query): Query<ListQuery>) -> ApiResult {
    let inner = state.enter(Route::ListProducts)?;
    let matching: Vec<&FakeProduct> = inner
        .products
        .iter()
        .filter(|p| query.category.as_ref().is_none_or(|c| &p.category == c))
        .collect();

    let total_pages = matching.len().div_ceil(PAGE_SIZE).max(1);
    let current = query.page.unwrap_or(1).clamp(1, total_pages);
    let products: Vec<Value> = matching
        .iter()
        .skip((current - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|p| p.to_json())
        .collect();

    Ok(Json(json!({
        "success": true,
        "products": products,
        "pagination": {
            "total_pages": total_pages,
            "current_page": current,
            "has_pre": current > 1,
            "has_next": current < total_pages,
            "category": query.category.unwrap_or_default(),
        },
        "messages": [],
    })))
}

async fn get_product(State(state): State<Shared>, Path(id): Path<String>) -> ApiResult {
    let inner = state.enter(Route::GetProduct)?;
    let product = inner
        .product(&id)
        .ok_or_else(|| Reject(StatusCode::NOT_FOUND, "product not found".to_string()))?;
    Ok(Json(json!({ "success": true, "product": product.to_json() })))
}

async fn get_cart(State(state): State<Shared>) -> ApiResult {
    let delay = {
        let mut inner = state.enter(Route::GetCart)?;
        (!inner.cart_delays.is_empty()).then(|| inner.cart_delays.remove(0))
    };
    // Snapshot the cart before sleeping so a delayed response is stale
    let body = json!({ "success": true, "data": state.lock().cart_json(), "messages": [] });
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Ok(Json(body))
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct LineBody {
    product_id: String,
    qty: u32,
}

async fn add_to_cart(State(state): State<Shared>, Json(body): Json<Envelope<LineBody>>) -> ApiResult {
    let mut inner = state.enter(Route::AddToCart)?;
    let LineBody { product_id, qty } = body.data;
    if inner.product(&product_id).is_none() {
        return Err(Reject(StatusCode::BAD_REQUEST, "product not found".to_string()));
    }
    if qty == 0 {
        return Err(Reject(StatusCode::BAD_REQUEST, "qty must be positive".to_string()));
    }

    if let Some(line) = inner.lines.iter_mut().find(|l| l.product_id == product_id) {
        line.qty += qty;
    } else {
        inner.next_line += 1;
        let id = inner.next_line.to_string();
        inner.lines.push(Line {
            id,
            product_id,
            qty,
        });
    }
    ok("added to cart")
}

async fn update_cart_line(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Envelope<LineBody>>,
) -> ApiResult {
    let mut inner = state.enter(Route::UpdateCartLine)?;
    let line = inner
        .lines
        .iter_mut()
        .find(|l| l.id == id)
        .ok_or_else(|| Reject(StatusCode::NOT_FOUND, "cart line not found".to_string()))?;
    line.product_id = body.data.product_id;
    line.qty = body.data.qty;
    ok("cart updated")
}

async fn remove_cart_line(State(state): State<Shared>, Path(id): Path<String>) -> ApiResult {
    let mut inner = state.enter(Route::RemoveCartLine)?;
    let before = inner.lines.len();
    inner.lines.retain(|l| l.id != id);
    if inner.lines.len() == before {
        return Err(Reject(StatusCode::NOT_FOUND, "cart line not found".to_string()));
    }
    ok("removed")
}

async fn clear_cart(State(state): State<Shared>) -> ApiResult {
    let mut inner = state.enter(Route::ClearCart)?;
    inner.lines.clear();
    inner.discount_percent = 0;
    ok("cart cleared")
}

#[derive(Deserialize)]
struct CouponBody {
    code: String,
}

async fn apply_coupon(
    State(state): State<Shared>,
    Json(body): Json<Envelope<CouponBody>>,
) -> ApiResult {
    let mut inner = state.enter(Route::ApplyCoupon)?;
    if body.data.code != COUPON {
        // The real API answers 200 with success: false here
        return Ok(Json(json!({ "success": false, "message": "coupon not found" })));
    }
    inner.discount_percent = 10;
    ok("coupon applied")
}

#[derive(Deserialize)]
struct OrderBody {
    user: Value,
    #[serde(default)]
    message: String,
}

async fn submit_order(
    State(state): State<Shared>,
    Json(body): Json<Envelope<OrderBody>>,
) -> ApiResult {
    let mut inner = state.enter(Route::SubmitOrder)?;
    if inner.lines.is_empty() {
        return Err(Reject(StatusCode::BAD_REQUEST, "cart is empty".to_string()));
    }
    let missing: Vec<&str> = ["name", "email", "tel", "address"]
        .into_iter()
        .filter(|f| body.data.user.get(f).and_then(Value::as_str).is_none_or(str::is_empty))
        .collect();
    if !missing.is_empty() {
        let messages: Vec<String> = missing.iter().map(|f| format!("user.{f} is required")).collect();
        return Ok(Json(json!({ "success": false, "message": messages })));
    }

    let cart = inner.cart_json();
    let total = cart["final_total"].as_i64().unwrap_or_default();
    let id = format!("-Order{}", inner.orders.len() + 1);
    inner.orders.push(PlacedOrder {
        id: id.clone(),
        is_paid: false,
        message: body.data.message,
        user: body.data.user,
        lines: cart["carts"].as_array().cloned().unwrap_or_default(),
        total,
    });
    inner.lines.clear();
    inner.discount_percent = 0;

    Ok(Json(json!({
        "success": true,
        "message": "order created",
        "orderId": id,
        "total": total,
        "create_at": ORDER_CREATED_AT,
    })))
}

async fn get_order(State(state): State<Shared>, Path(id): Path<String>) -> ApiResult {
    let inner = state.enter(Route::GetOrder)?;
    let order = inner
        .orders
        .iter()
        .find(|o| o.id == id)
        .ok_or_else(|| Reject(StatusCode::NOT_FOUND, "order not found".to_string()))?;

    let products: serde_json::Map<String, Value> = order
        .lines
        .iter()
        .filter_map(|l| Some((l["id"].as_str()?.to_string(), l.clone())))
        .collect();

    Ok(Json(json!({
        "success": true,
        "order": {
            "id": order.id,
            "create_at": ORDER_CREATED_AT,
            "is_paid": order.is_paid,
            "message": order.message,
            "total": order.total,
            "user": order.user,
            "products": products,
        },
    })))
}

async fn pay_order(State(state): State<Shared>, Path(id): Path<String>) -> ApiResult {
    let mut inner = state.enter(Route::PayOrder)?;
    let order = inner
        .orders
        .iter_mut()
        .find(|o| o.id == id)
        .ok_or_else(|| Reject(StatusCode::NOT_FOUND, "order not found".to_string()))?;
    order.is_paid = true;
    ok("paid")
}
