//! Read-only product catalog.
//!
//! Products change rarely, so listings and details are cached with `moka`
//! (TTL from configuration). Cart state never goes through this cache.
//!
//! A product detail is only valid for display once [`ProductCatalog::get_product`]
//! has resolved; there is no partially-loaded product.

use std::sync::Arc;
use std::time::Duration;

use cartwheel_core::{Product, ProductId, ProductPage};
use moka::future::Cache;
use tracing::{debug, instrument};

use crate::api::{CommerceApi, ProductQuery};
use crate::error::{Result, StoreError};

/// Maximum number of cached entries.
const CACHE_CAPACITY: u64 = 1000;

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Product(ProductId),
    Page(ProductQuery),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Page(ProductPage),
}

/// Product listing and detail lookups backed by the commerce API.
#[derive(Clone)]
pub struct ProductCatalog {
    api: Arc<dyn CommerceApi>,
    cache: Cache<CacheKey, CacheValue>,
}

impl ProductCatalog {
    /// Create a catalog whose entries live for `ttl`.
    #[must_use]
    pub fn new(api: Arc<dyn CommerceApi>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(ttl)
            .build();

        Self { api, cache }
    }

    /// List the first page of products across all categories.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Fetch` if the API request fails.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self
            .list_products_page(ProductQuery::default())
            .await?
            .products)
    }

    /// List one page of products, optionally filtered by category.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Fetch` if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products_page(&self, query: ProductQuery) -> Result<ProductPage> {
        let key = CacheKey::Page(query.clone());

        if let Some(CacheValue::Page(page)) = self.cache.get(&key).await {
            debug!("Cache hit for product page");
            return Ok(page);
        }

        let page = self.api.list_products(&query).await?;

        // Listing results double as detail entries
        for product in &page.products {
            self.cache
                .insert(
                    CacheKey::Product(product.id.clone()),
                    CacheValue::Product(Box::new(product.clone())),
                )
                .await;
        }
        self.cache.insert(key, CacheValue::Page(page.clone())).await;

        Ok(page)
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for a blank ID, `StoreError::NotFound`
    /// if the product does not exist, or `StoreError::Fetch` if the API
    /// request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product> {
        if id.is_blank() {
            return Err(StoreError::Validation("product ID is required".to_string()));
        }

        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product = self
            .api
            .get_product(id)
            .await
            .map_err(StoreError::from_lookup)?;

        self.cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.cache.invalidate(&CacheKey::Product(id.clone())).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
