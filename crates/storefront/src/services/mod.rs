//! Business logic services for storefront.
//!
//! Services borrow their stores from [`crate::db::Storage`] and are cheap to
//! build per request.
//!
//! # Services
//!
//! - `auth` - Registration, login and role changes
//! - `cart` - Per-user cart lines
//! - `catalog` - Product listing, search and admin CRUD
//! - `checkout` - Atomic order placement

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use catalog::{CatalogError, CatalogService};
pub use checkout::{
    CheckoutError, CheckoutLine, CheckoutService, CheckoutSummary, OrderPlan, plan_order,
};
