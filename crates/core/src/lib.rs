//! Cartwheel Core - Shared types library.
//!
//! This crate provides the domain types used across all Cartwheel components:
//! - `storefront` - Commerce API client, catalog, cart synchronizer and checkout
//! - `cli` - Command-line storefront driving the library
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, emails, products, carts, customers and orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
