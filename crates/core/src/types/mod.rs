//! Core types for Cartwheel.
//!
//! This module provides type-safe wrappers and plain data types for the
//! storefront domain: products, cart snapshots, customers and orders.

pub mod cart;
pub mod customer;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;

pub use cart::{CartLine, CartSnapshot};
pub use customer::{
    BasicCustomerValidator, Customer, CustomerError, CustomerField, CustomerForm,
    CustomerValidator, FieldError,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{Order, OrderLine, OrderReceipt};
pub use price::{CurrencyCode, Price, UnknownCurrency};
pub use product::{Pagination, Product, ProductPage};
