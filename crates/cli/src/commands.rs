//! Command execution.
//!
//! Every command is a single store action. The cart lives on the server, so
//! commands that act on cart lines refresh the local view first.

use cartwheel_storefront::{Action, Outcome, StoreContext};

use crate::console;

/// Run one action and print its result. Returns `false` if it failed.
pub async fn run(store: &StoreContext, action: Action) -> bool {
    if needs_cart(&action) && store.dispatch(Action::RefreshCart).await.is_failed() {
        return false;
    }

    match store.dispatch(action).await {
        Outcome::Products(page) => console::print(&console::product_page(&page)),
        Outcome::Product(product) => console::print(&console::product(&product)),
        Outcome::Cart(cart) => console::print(&console::cart(&cart)),
        Outcome::Ordered(placed) => console::print(&console::receipt(&placed.receipt)),
        Outcome::Order(order) => console::print(&console::order(&order)),
        Outcome::Ignored => tracing::debug!("Action ignored"),
        // Already reported by the notifier
        Outcome::Failed(_) => return false,
    }
    true
}

/// Actions that read the current snapshot before talking to the server.
const fn needs_cart(action: &Action) -> bool {
    matches!(
        action,
        Action::UpdateQuantity { .. }
            | Action::Increment(_)
            | Action::Decrement(_)
            | Action::Checkout { .. }
    )
}
