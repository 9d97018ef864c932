//! User-visible notifications.
//!
//! Failures caught by [`crate::StoreContext::dispatch`] and confirmations of
//! successful actions are handed to a [`Notifier`]. How they reach the user is
//! up to the front end; the CLI prints them, tests buffer them.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use crate::error::{StoreError, add_breadcrumb, capture_fetch_error};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

/// What produced an error notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Fetch,
    NotFound,
}

impl From<&StoreError> for ErrorKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::Validation(_) => Self::Validation,
            StoreError::Fetch(_) => Self::Fetch,
            StoreError::NotFound(_) => Self::NotFound,
        }
    }
}

/// A message to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub kind: Option<ErrorKind>,
}

impl Notification {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
            kind: None,
        }
    }

    /// An order went through but the cart view could not be reloaded.
    #[must_use]
    pub fn stale_cart(err: &StoreError) -> Self {
        Self {
            level: Level::Error,
            message: format!("Order placed, but the cart could not be reloaded: {err}"),
            kind: Some(ErrorKind::from(err)),
        }
    }

    #[must_use]
    pub fn error(err: &StoreError) -> Self {
        Self {
            level: Level::Error,
            message: err.to_string(),
            kind: Some(ErrorKind::from(err)),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Info => f.write_str(&self.message),
            Level::Error => write!(f, "error: {}", self.message),
        }
    }
}

/// Receives notifications produced by dispatched actions.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    /// Surface a caught error. Fetch failures are also reported to Sentry.
    fn notify_error(&self, err: &StoreError) {
        capture_fetch_error(err);
        self.notify(Notification::error(err));
    }
}

/// Logs notifications and leaves a Sentry breadcrumb for each.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Info => info!(message = %notification.message, "Notification"),
            Level::Error => warn!(
                message = %notification.message,
                kind = ?notification.kind,
                "Error notification"
            ),
        }
        add_breadcrumb("notification", &notification.message, None);
    }
}

/// Collects notifications in memory until drained.
#[derive(Debug, Default)]
pub struct BufferedNotifier {
    pending: Mutex<Vec<Notification>>,
}

impl BufferedNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every notification received so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for BufferedNotifier {
    fn notify(&self, notification: Notification) {
        add_breadcrumb("notification", &notification.message, None);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}
