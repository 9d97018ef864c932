//! Cart synchronization.
//!
//! [`CartSynchronizer`] owns the local view of the remote cart. Every mutation
//! goes to the server first and is followed by exactly one full refresh; the
//! local [`CartSnapshot`] is never patched in place and never recomputed from
//! line data. A failed call leaves the snapshot exactly as it was.
//!
//! # Refresh-after-write
//!
//! Totals may include discount logic only the server knows, so a locally
//! computed total could drift from the real one. One extra `GET /cart` per
//! mutation is the price for never showing such a total.
//!
//! # Racing refreshes
//!
//! Mutations are not serialized. Two quick quantity changes for the same line
//! both reach the server, and their refreshes may complete in either order.
//! Each refresh draws a ticket from a monotonically increasing counter before
//! its request is sent; a response is applied only if its ticket is newer than
//! the ticket of the snapshot currently held. A late response from an older
//! refresh is dropped, and its caller receives the newer snapshot instead.
//!
//! Callers should still avoid firing overlapping mutations for one product:
//! [`CartSynchronizer::is_busy`] reports products with a mutation in flight.

mod busy;

pub use busy::{BusyGuard, BusySet};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use cartwheel_core::{CartLineId, CartSnapshot, CurrencyCode, ProductId};
use tracing::{debug, instrument, warn};

use crate::api::{ApiError, CartLineInput, CommerceApi};
use crate::error::{Result, StoreError};

/// Snapshot currently shown, with the ticket of the refresh that produced it.
struct Applied {
    ticket: u64,
    snapshot: Arc<CartSnapshot>,
}

/// Keeps a local cart snapshot consistent with the server.
pub struct CartSynchronizer {
    api: Arc<dyn CommerceApi>,
    applied: RwLock<Applied>,
    next_ticket: AtomicU64,
    busy: BusySet,
}

impl CartSynchronizer {
    /// Create a synchronizer holding an empty cart until the first refresh.
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, currency: CurrencyCode) -> Self {
        Self {
            api,
            applied: RwLock::new(Applied {
                ticket: 0,
                snapshot: Arc::new(CartSnapshot::empty(currency)),
            }),
            next_ticket: AtomicU64::new(1),
            busy: BusySet::default(),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CartSnapshot> {
        Arc::clone(
            &self
                .applied
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .snapshot,
        )
    }

    /// Whether a mutation for the product is in flight.
    #[must_use]
    pub fn is_busy(&self, product_id: &ProductId) -> bool {
        self.busy.is_busy(product_id)
    }

    /// Products with a mutation in flight.
    #[must_use]
    pub fn busy_products(&self) -> Vec<ProductId> {
        self.busy.busy_products()
    }

    #[cfg(test)]
    pub(crate) fn mark_busy(&self, product_id: ProductId) -> BusyGuard<'_> {
        self.busy.mark(product_id)
    }

    /// Fetch the cart and replace the local snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Fetch` if the request fails; the previous snapshot
    /// is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<CartSnapshot>> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let fresh = self.api.get_cart().await.map_err(|e| fetch_failed("refresh", e))?;
        Ok(self.apply(ticket, fresh))
    }

    /// Install `fresh` unless a newer refresh already landed.
    fn apply(&self, ticket: u64, fresh: CartSnapshot) -> Arc<CartSnapshot> {
        let mut applied = self.applied.write().unwrap_or_else(PoisonError::into_inner);
        if ticket <= applied.ticket {
            debug!(
                ticket,
                current = applied.ticket,
                "Discarding stale cart response"
            );
            return Arc::clone(&applied.snapshot);
        }

        applied.ticket = ticket;
        applied.snapshot = Arc::new(fresh);
        debug!(
            ticket,
            lines = applied.snapshot.lines.len(),
            "Cart snapshot replaced"
        );
        Arc::clone(&applied.snapshot)
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` without a network call if the product
    /// ID is absent or blank or `quantity` is zero, and `StoreError::Fetch` if
    /// the addition or the following refresh fails.
    #[instrument(skip(self), fields(product_id = ?product_id.map(ProductId::as_str)))]
    pub async fn add_item(
        &self,
        product_id: Option<&ProductId>,
        quantity: u32,
    ) -> Result<Arc<CartSnapshot>> {
        let product_id = product_id
            .filter(|id| !id.is_blank())
            .ok_or_else(|| StoreError::Validation("product ID is required".to_string()))?;
        if quantity < 1 {
            return Err(StoreError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }

        let _busy = self.busy.mark(product_id.clone());
        let line = CartLineInput {
            product_id: product_id.clone(),
            quantity,
        };
        self.api
            .add_to_cart(&line)
            .await
            .map_err(|e| fetch_failed("add_item", e))?;

        self.refresh().await
    }

    /// Set the quantity of a cart line.
    ///
    /// A quantity below 1 is ignored: nothing is sent and the current snapshot
    /// is returned. Removing a line is done with [`Self::remove_item`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` without a network call if the line is not
    /// in the current snapshot (the local view is stale), and
    /// `StoreError::Fetch` if the update or the following refresh fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_quantity(
        &self,
        line_id: &CartLineId,
        new_quantity: u32,
    ) -> Result<Arc<CartSnapshot>> {
        if new_quantity < 1 {
            debug!("Ignoring quantity below 1");
            return Ok(self.snapshot());
        }

        let product_id = self
            .snapshot()
            .line(line_id)
            .map(|line| line.product_id().clone())
            .ok_or_else(|| StoreError::NotFound(format!("cart line {line_id}")))?;

        let _busy = self.busy.mark(product_id.clone());
        let line = CartLineInput {
            product_id,
            quantity: new_quantity,
        };
        self.api
            .update_cart_line(line_id, &line)
            .await
            .map_err(|e| fetch_failed("update_quantity", e))?;

        self.refresh().await
    }

    /// Raise a line's quantity by one.
    ///
    /// # Errors
    ///
    /// See [`Self::update_quantity`].
    pub async fn increment(&self, line_id: &CartLineId) -> Result<Arc<CartSnapshot>> {
        let current = self.current_quantity(line_id)?;
        self.update_quantity(line_id, current.saturating_add(1))
            .await
    }

    /// Lower a line's quantity by one. A line at quantity 1 is left alone.
    ///
    /// # Errors
    ///
    /// See [`Self::update_quantity`].
    pub async fn decrement(&self, line_id: &CartLineId) -> Result<Arc<CartSnapshot>> {
        let current = self.current_quantity(line_id)?;
        self.update_quantity(line_id, current.saturating_sub(1))
            .await
    }

    fn current_quantity(&self, line_id: &CartLineId) -> Result<u32> {
        self.snapshot()
            .line(line_id)
            .map(|line| line.quantity)
            .ok_or_else(|| StoreError::NotFound(format!("cart line {line_id}")))
    }

    /// Delete one line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Fetch` if the deletion or the following refresh
    /// fails.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_item(&self, line_id: &CartLineId) -> Result<Arc<CartSnapshot>> {
        self.api
            .remove_cart_line(line_id)
            .await
            .map_err(|e| fetch_failed("remove_item", e))?;

        self.refresh().await
    }

    /// Delete every line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Fetch` if the deletion or the following refresh
    /// fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<Arc<CartSnapshot>> {
        self.api
            .clear_cart()
            .await
            .map_err(|e| fetch_failed("clear", e))?;

        self.refresh().await
    }

    /// Apply a coupon; the refreshed snapshot carries the discounted total.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` without a network call for a blank
    /// code, and `StoreError::Fetch` if the server rejects the coupon or the
    /// following refresh fails.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> Result<Arc<CartSnapshot>> {
        let code = code.trim();
        if code.is_empty() {
            return Err(StoreError::Validation("coupon code is required".to_string()));
        }

        self.api
            .apply_coupon(code)
            .await
            .map_err(|e| fetch_failed("apply_coupon", e))?;

        self.refresh().await
    }
}

fn fetch_failed(operation: &'static str, err: ApiError) -> StoreError {
    warn!(operation, error = %err, "Cart operation failed; keeping previous snapshot");
    StoreError::Fetch(err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::testing::{COUPON, FakeCommerceApi, Op, product};

    fn setup() -> (Arc<FakeCommerceApi>, CartSynchronizer) {
        let api = Arc::new(FakeCommerceApi::new());
        api.add_product(product("42", "Widget", 100));
        api.add_product(product("7", "Gadget", 250));
        let cart = CartSynchronizer::new(api.clone(), CurrencyCode::TWD);
        (api, cart)
    }

    fn amount(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let (api, cart) = setup();
        let snapshot = cart.snapshot();
        assert!(snapshot.is_empty());
        assert!(snapshot.subtotal.is_zero());
        assert_eq!(api.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_add_item_refreshes_once() {
        let (api, cart) = setup();

        let snapshot = cart
            .add_item(Some(&ProductId::new("42")), 2)
            .await
            .unwrap();

        assert_eq!(api.calls().add_to_cart, 1);
        assert_eq!(api.calls().get_cart, 1);
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].quantity, 2);
        assert_eq!(snapshot.subtotal.amount, amount(200));
        assert!(Arc::ptr_eq(&snapshot, &cart.snapshot()));
    }

    #[tokio::test]
    async fn test_add_item_without_product_is_validation_error() {
        let (api, cart) = setup();

        let missing = cart.add_item(None, 1).await;
        let blank = cart.add_item(Some(&ProductId::new("  ")), 1).await;
        let zero = cart.add_item(Some(&ProductId::new("42")), 0).await;

        assert!(matches!(missing, Err(StoreError::Validation(_))));
        assert!(matches!(blank, Err(StoreError::Validation(_))));
        assert!(matches!(zero, Err(StoreError::Validation(_))));
        assert_eq!(api.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_add_item_failure_keeps_snapshot() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("7")), 1).await.unwrap();
        let before = cart.snapshot();

        api.fail_next(Op::AddToCart);
        let result = cart.add_item(Some(&ProductId::new("42")), 1).await;

        assert!(matches!(result, Err(StoreError::Fetch(_))));
        assert_eq!(*cart.snapshot(), *before);
        assert_eq!(api.calls().get_cart, 1);
        assert!(!cart.is_busy(&ProductId::new("42")));
    }

    #[tokio::test]
    async fn test_refresh_failure_after_mutation_keeps_snapshot() {
        let (api, cart) = setup();
        let before = cart.snapshot();

        api.fail_next(Op::GetCart);
        let result = cart.add_item(Some(&ProductId::new("42")), 1).await;

        assert!(matches!(result, Err(StoreError::Fetch(_))));
        assert_eq!(*cart.snapshot(), *before);
        // The server did take the write; the next refresh shows it.
        assert_eq!(cart.refresh().await.unwrap().lines.len(), 1);
    }

    #[tokio::test]
    async fn test_update_quantity_scenario() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 2).await.unwrap();
        let line_id = cart.snapshot().lines[0].id.clone();
        assert_eq!(cart.snapshot().lines[0].total.amount, amount(200));

        let snapshot = cart.update_quantity(&line_id, 3).await.unwrap();

        assert_eq!(api.calls().update_cart_line, 1);
        assert_eq!(api.calls().get_cart, 2);
        assert_eq!(snapshot.lines[0].id, line_id);
        assert_eq!(snapshot.lines[0].quantity, 3);
        assert_eq!(snapshot.lines[0].total.amount, amount(300));
        assert_eq!(snapshot.subtotal.amount, amount(300));
    }

    #[tokio::test]
    async fn test_update_quantity_below_one_is_noop() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 2).await.unwrap();
        let before = cart.snapshot();
        let calls_before = api.calls();

        let snapshot = cart
            .update_quantity(&before.lines[0].id, 0)
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&snapshot, &before));
        assert_eq!(api.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_update_quantity_unknown_line_is_not_found() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 1).await.unwrap();
        let calls_before = api.calls();

        let result = cart.update_quantity(&CartLineId::new("999"), 4).await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(api.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_update_quantity_failure_keeps_snapshot() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 2).await.unwrap();
        let before = cart.snapshot();

        api.fail_next(Op::UpdateCartLine);
        let result = cart.update_quantity(&before.lines[0].id, 5).await;

        assert!(matches!(result, Err(StoreError::Fetch(_))));
        assert_eq!(*cart.snapshot(), *before);
    }

    #[tokio::test]
    async fn test_increment_and_decrement() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 1).await.unwrap();
        let line_id = cart.snapshot().lines[0].id.clone();

        let snapshot = cart.increment(&line_id).await.unwrap();
        assert_eq!(snapshot.lines[0].quantity, 2);

        let snapshot = cart.decrement(&line_id).await.unwrap();
        assert_eq!(snapshot.lines[0].quantity, 1);

        // Decrement to zero is blocked client-side
        let updates = api.calls().update_cart_line;
        let snapshot = cart.decrement(&line_id).await.unwrap();
        assert_eq!(snapshot.lines[0].quantity, 1);
        assert_eq!(api.calls().update_cart_line, updates);
    }

    #[tokio::test]
    async fn test_increment_unknown_line() {
        let (_api, cart) = setup();
        let result = cart.increment(&CartLineId::new("nope")).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_item() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 1).await.unwrap();
        cart.add_item(Some(&ProductId::new("7")), 1).await.unwrap();
        let line_id = cart.snapshot().lines[0].id.clone();

        let snapshot = cart.remove_item(&line_id).await.unwrap();

        assert_eq!(snapshot.lines.len(), 1);
        assert!(snapshot.line(&line_id).is_none());
        assert_eq!(api.calls().get_cart, 3);
    }

    #[tokio::test]
    async fn test_remove_item_failure_keeps_snapshot() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 1).await.unwrap();
        let before = cart.snapshot();

        api.fail_next(Op::RemoveCartLine);
        let result = cart.remove_item(&before.lines[0].id).await;

        assert!(matches!(result, Err(StoreError::Fetch(_))));
        assert_eq!(*cart.snapshot(), *before);
    }

    #[tokio::test]
    async fn test_clear_empties_cart_and_totals() {
        let (_api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 2).await.unwrap();
        cart.add_item(Some(&ProductId::new("7")), 1).await.unwrap();

        let snapshot = cart.clear().await.unwrap();

        assert!(snapshot.lines.is_empty());
        assert!(snapshot.subtotal.is_zero());
        assert!(snapshot.final_total.is_zero());
    }

    #[tokio::test]
    async fn test_clear_failure_keeps_snapshot() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 2).await.unwrap();
        let before = cart.snapshot();

        api.fail_next(Op::ClearCart);
        assert!(cart.clear().await.is_err());
        assert_eq!(*cart.snapshot(), *before);
    }

    #[tokio::test]
    async fn test_apply_coupon_uses_server_final_total() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 2).await.unwrap();

        assert!(matches!(
            cart.apply_coupon("  ").await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(api.calls().apply_coupon, 0);

        let snapshot = cart.apply_coupon(COUPON).await.unwrap();
        assert_eq!(snapshot.subtotal.amount, amount(200));
        assert_eq!(snapshot.final_total.amount, amount(180));

        let before = cart.snapshot();
        assert!(matches!(
            cart.apply_coupon("BOGUS").await,
            Err(StoreError::Fetch(ApiError::Rejected(_)))
        ));
        assert_eq!(*cart.snapshot(), *before);
    }

    #[tokio::test]
    async fn test_stale_refresh_is_discarded() {
        let (api, cart) = setup();

        // Two refreshes are issued; the later one answers first.
        let older = cart.next_ticket.fetch_add(1, Ordering::SeqCst);
        let stale = api.server_cart();
        api.add_to_cart(&CartLineInput {
            product_id: ProductId::new("42"),
            quantity: 3,
        })
        .await
        .unwrap();
        let newer = cart.next_ticket.fetch_add(1, Ordering::SeqCst);
        let fresh = api.server_cart();

        let applied = cart.apply(newer, fresh.clone());
        assert_eq!(*applied, fresh);

        // The older response lands late and must not overwrite.
        let after_stale = cart.apply(older, stale);
        assert_eq!(*after_stale, fresh);
        assert_eq!(cart.snapshot().lines[0].quantity, 3);

        // A later refresh still applies normally.
        let refreshed = cart.refresh().await.unwrap();
        assert_eq!(*refreshed, fresh);
    }

    #[tokio::test]
    async fn test_concurrent_updates_settle_on_server_state() {
        let (api, cart) = setup();
        cart.add_item(Some(&ProductId::new("42")), 1).await.unwrap();
        let line_id = cart.snapshot().lines[0].id.clone();

        let (a, b) = tokio::join!(
            cart.update_quantity(&line_id, 4),
            cart.update_quantity(&line_id, 6)
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(*cart.snapshot(), api.server_cart());
    }

    #[tokio::test]
    async fn test_busy_marker_held_only_in_flight() {
        let (_api, cart) = setup();
        let id = ProductId::new("42");
        cart.add_item(Some(&id), 1).await.unwrap();
        assert!(!cart.is_busy(&id));
        assert!(cart.busy_products().is_empty());
    }
}
