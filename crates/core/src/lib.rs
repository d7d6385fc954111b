//! Supermarket Core - Shared domain types.
//!
//! This crate provides the value types used across all Supermarket components:
//! - `storefront` - Customer-facing shop, cart, checkout and admin panel
//! - `cli` - Command-line tools for migrations, seeding and role management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP. Every type validates on construction, so a `Quantity` or a `Money`
//! that exists is already known to be in range.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money, quantities and user roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
