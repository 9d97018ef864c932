//! Type conversion functions for commerce API responses.

use cartwheel_core::{
    CartLine, CartLineId, CartSnapshot, CurrencyCode, Customer, Email, Order, OrderId, OrderLine,
    OrderReceipt, Pagination, Price, Product, ProductId, ProductPage,
};
use chrono::{DateTime, Utc};
use tracing::warn;

use super::ApiError;
use super::wire::{
    CartData, CartLineData, OrderCreatedResponse, OrderData, PaginationData, ProductData,
    ProductsResponse, UserData,
};

pub fn convert_product(data: ProductData, currency: CurrencyCode) -> Product {
    Product {
        id: ProductId::new(data.id),
        title: data.title,
        category: data.category,
        unit: data.unit,
        origin_price: Price::new(data.origin_price, currency),
        price: Price::new(data.price, currency),
        image_url: data.image_url.filter(|url| !url.is_empty()),
        images: data
            .images_url
            .into_iter()
            .filter(|url| !url.is_empty())
            .collect(),
        description: data.description,
        content: data.content,
        is_enabled: data.is_enabled,
    }
}

pub fn convert_product_page(data: ProductsResponse, currency: CurrencyCode) -> ProductPage {
    let products: Vec<Product> = data
        .products
        .into_iter()
        .map(|p| convert_product(p, currency))
        .collect();

    let pagination = data.pagination.map_or_else(
        || Pagination {
            total_pages: 1,
            current_page: 1,
            ..Pagination::default()
        },
        convert_pagination,
    );

    ProductPage {
        products,
        pagination,
    }
}

fn convert_pagination(data: PaginationData) -> Pagination {
    Pagination {
        total_pages: data.total_pages,
        current_page: data.current_page,
        has_previous: data.has_pre,
        has_next: data.has_next,
        category: data.category.filter(|c| !c.is_empty()),
    }
}

/// Convert the cart payload, dropping lines that report a zero quantity.
pub fn convert_cart(data: CartData, currency: CurrencyCode) -> CartSnapshot {
    CartSnapshot {
        lines: data
            .carts
            .into_iter()
            .filter_map(|line| convert_cart_line(line, currency))
            .collect(),
        subtotal: Price::new(data.total, currency),
        final_total: Price::new(data.final_total, currency),
    }
}

fn convert_cart_line(data: CartLineData, currency: CurrencyCode) -> Option<CartLine> {
    if data.qty == 0 {
        warn!(line_id = %data.id, "Dropping cart line with zero quantity");
        return None;
    }

    Some(CartLine {
        id: CartLineId::new(data.id),
        product: convert_product(data.product, currency),
        quantity: data.qty,
        total: Price::new(data.total, currency),
        final_total: Price::new(data.final_total, currency),
    })
}

pub fn convert_receipt(
    data: OrderCreatedResponse,
    currency: CurrencyCode,
) -> Result<OrderReceipt, ApiError> {
    Ok(OrderReceipt {
        order_id: OrderId::new(data.order_id),
        total: Price::new(data.total, currency),
        created_at: convert_timestamp(data.create_at)?,
    })
}

pub fn convert_order(data: OrderData, currency: CurrencyCode) -> Result<Order, ApiError> {
    Ok(Order {
        id: OrderId::new(data.id),
        created_at: convert_timestamp(data.create_at)?,
        is_paid: data.is_paid,
        total: Price::new(data.total, currency),
        message: data.message.filter(|m| !m.is_empty()),
        customer: convert_user(data.user)?,
        lines: data
            .products
            .into_values()
            .map(|line| OrderLine {
                product: convert_product(line.product, currency),
                quantity: line.qty,
                final_total: Price::new(line.final_total, currency),
            })
            .collect(),
    })
}

fn convert_user(data: UserData) -> Result<Customer, ApiError> {
    let email = Email::parse(&data.email)
        .map_err(|e| ApiError::InvalidResponse(format!("order email: {e}")))?;

    Ok(Customer {
        name: data.name,
        email,
        tel: data.tel,
        address: data.address,
    })
}

fn convert_timestamp(secs: i64) -> Result<DateTime<Utc>, ApiError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ApiError::InvalidResponse(format!("timestamp out of range: {secs}")))
}
