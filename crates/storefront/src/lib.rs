//! Cartwheel storefront library.
//!
//! Talks to a remote commerce REST API and keeps a local cart view in step
//! with it. Front ends build a [`StoreContext`], read the cart through its
//! projections and change it by dispatching [`Action`]s.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod notify;
pub mod order;

#[cfg(test)]
mod testing;

pub use api::{ApiError, CommerceApi, CommerceClient, ProductQuery};
pub use cart::CartSynchronizer;
pub use catalog::ProductCatalog;
pub use config::{CommerceApiConfig, ConfigError, StorefrontConfig};
pub use context::{Action, Outcome, StoreContext};
pub use error::{Result, StoreError};
pub use notify::{BufferedNotifier, Notification, Notifier, TracingNotifier};
pub use order::{OrderSubmitter, PlacedOrder};
