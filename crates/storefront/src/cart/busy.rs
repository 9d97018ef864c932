//! Advisory in-flight markers for cart mutations.
//!
//! A product is busy while an add or quantity update for it is outstanding.
//! Nothing here blocks a second request; callers check [`BusySet::is_busy`]
//! and disable or ignore the triggering control.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use cartwheel_core::ProductId;

/// Products with at least one mutation in flight.
#[derive(Debug, Default)]
pub struct BusySet {
    in_flight: Mutex<HashMap<ProductId, usize>>,
}

impl BusySet {
    fn lock(&self) -> MutexGuard<'_, HashMap<ProductId, usize>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a product busy until the returned guard drops.
    pub fn mark(&self, id: ProductId) -> BusyGuard<'_> {
        *self.lock().entry(id.clone()).or_insert(0) += 1;
        BusyGuard { set: self, id }
    }

    /// Whether any mutation for the product is in flight.
    #[must_use]
    pub fn is_busy(&self, id: &ProductId) -> bool {
        self.lock().contains_key(id)
    }

    /// Every busy product, sorted.
    #[must_use]
    pub fn busy_products(&self) -> Vec<ProductId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Clears one busy mark on drop.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    set: &'a BusySet,
    id: ProductId,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.set.lock();
        if let Some(count) = in_flight.get_mut(&self.id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                in_flight.remove(&self.id);
            }
        }
    }
}
