//! Product catalog over HTTP.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use cartwheel_core::ProductId;
use cartwheel_integration_tests::{FakeCommerceServer, FakeProduct, PAGE_SIZE, Route};
use cartwheel_storefront::{ProductCatalog, ProductQuery, StoreError};
use rust_decimal::Decimal;

fn catalog_for(server: &FakeCommerceServer) -> ProductCatalog {
    ProductCatalog::new(Arc::new(server.client()), Duration::from_secs(60))
}

#[tokio::test]
async fn test_list_products_parses_wire_shape() {
    let server = FakeCommerceServer::start().await;
    server.add_product(FakeProduct::new("42", "Widget", 100).on_sale_from(120));
    server.add_product(FakeProduct::new("7", "Gadget", 250).disabled());

    let products = catalog_for(&server).list_products().await.unwrap();

    assert_eq!(products.len(), 2);
    let widget = &products[0];
    assert_eq!(widget.id, ProductId::new("42"));
    assert_eq!(widget.price.amount, Decimal::new(100, 0));
    assert!(widget.is_on_sale());
    assert_eq!(
        widget.image_url.as_deref(),
        Some("https://img.example.com/42.png")
    );
    // Blank gallery entries are dropped
    assert_eq!(widget.images, vec!["https://img.example.com/42-2.png"]);
    assert!(!products[1].is_enabled);
}

#[tokio::test]
async fn test_pagination_and_category_filter() {
    let server = FakeCommerceServer::start().await;
    for i in 0..PAGE_SIZE + 3 {
        server.add_product(FakeProduct::new(&format!("t{i}"), "Tea", 300).in_category("tea"));
    }
    server.add_product(FakeProduct::new("k1", "Kettle", 900).in_category("kitchen"));
    let catalog = catalog_for(&server);

    let page = catalog
        .list_products_page(ProductQuery {
            page: Some(2),
            category: Some("tea".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(page.products.len(), 3);
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(page.pagination.total_pages, 2);
    assert!(page.pagination.has_previous);
    assert!(!page.pagination.has_next);
    assert_eq!(page.pagination.category.as_deref(), Some("tea"));
}

#[tokio::test]
async fn test_product_detail_is_cached() {
    let server = FakeCommerceServer::start().await;
    server.add_product(FakeProduct::new("42", "Widget", 100));
    let catalog = catalog_for(&server);

    let first = catalog.get_product(&ProductId::new("42")).await.unwrap();
    let second = catalog.get_product(&ProductId::new("42")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.description, "About Widget");
    assert_eq!(server.count(Route::GetProduct), 1);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let server = FakeCommerceServer::start().await;

    let result = catalog_for(&server)
        .get_product(&ProductId::new("missing"))
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(ref m)) if m == "product not found"));
}

#[tokio::test]
async fn test_product_id_with_slashes_stays_on_product_route() {
    let server = FakeCommerceServer::start().await;

    let result = catalog_for(&server)
        .get_product(&ProductId::new("../cart"))
        .await;

    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert_eq!(server.count(Route::GetProduct), 1);
    assert_eq!(server.count(Route::GetCart), 0);
}

#[tokio::test]
async fn test_listing_failure_is_fetch_error() {
    let server = FakeCommerceServer::start().await;
    server.fail_next(Route::ListProducts);

    let result = catalog_for(&server).list_products().await;

    assert!(matches!(result, Err(StoreError::Fetch(_))));
}
