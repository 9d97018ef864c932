//! Storefront error type and Sentry reporting helpers.
//!
//! Every storefront operation returns `Result<T, StoreError>`. The three
//! kinds map onto what the caller can do about them:
//!
//! - `Validation` - fix the input; no request was sent
//! - `Fetch` - the server or the network failed; retry later
//! - `NotFound` - the local view is stale or the resource is gone; refresh

use cartwheel_core::CustomerError;
use thiserror::Error;

use crate::api::ApiError;

/// Storefront-level error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller input was rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure or non-success server response.
    #[error("Fetch error: {0}")]
    Fetch(#[from] ApiError),

    /// Referenced line, product or order does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Map an API error, turning a missing resource into `NotFound`.
    #[must_use]
    pub fn from_lookup(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(what) => Self::NotFound(what),
            other => Self::Fetch(other),
        }
    }

    /// Whether the error came from the server or the network.
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_))
    }
}

impl From<CustomerError> for StoreError {
    fn from(err: CustomerError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Send a fetch failure to Sentry and log it with the event ID.
pub fn capture_fetch_error(err: &StoreError) {
    if err.is_fetch() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            sentry_event_id = %event_id,
            "Commerce API failure"
        );
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
