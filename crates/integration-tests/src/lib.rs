//! Integration tests for the Supermarket storefront.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory suites (no services needed)
//! cargo test -p supermarket-integration-tests
//!
//! # Also run the PostgreSQL suite
//! SUPERMARKET_TEST_DATABASE_URL=postgres://localhost/supermarket_test \
//!     cargo test -p supermarket-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_scenarios` - Order placement outcomes and concurrency
//! - `checkout_atomicity` - Storage failures part way through a checkout
//! - `cart_and_catalog` - Cart merging, ownership, product validation
//! - `http_flow` - Register, shop and check out through the router
//! - `postgres` - The same properties against a real database (opt-in)
//!
//! This library holds the fixtures the suites share.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use supermarket_core::{Email, ProductId, UserId, UserRole};
use supermarket_storefront::db::{MemoryStore, Storage};
use supermarket_storefront::models::{NewUser, Product, ProductInput};
use supermarket_storefront::services::{CartService, CatalogService};

/// A fresh in-memory store with helpers for building scenarios.
pub struct Shop {
    pub memory: MemoryStore,
    pub storage: Storage,
}

impl Default for Shop {
    fn default() -> Self {
        Self::new()
    }
}

impl Shop {
    #[must_use]
    pub fn new() -> Self {
        let memory = MemoryStore::new();
        let storage = Storage::from_memory(&memory);
        Self { memory, storage }
    }

    /// Insert a customer account.
    pub async fn customer(&self, email: &str) -> UserId {
        self.storage
            .users
            .create(&NewUser {
                name: "Test Shopper".to_string(),
                email: Email::parse(email).unwrap(),
                password_hash: "not-a-real-hash".to_string(),
                role: UserRole::Customer,
            })
            .await
            .unwrap()
            .id
    }

    /// Insert a product. `price` is a decimal string such as `"2.50"`.
    pub async fn product(&self, name: &str, price: &str, stock: i32) -> ProductId {
        CatalogService::new(&self.storage)
            .create(&product_input(name, price, stock))
            .await
            .unwrap()
            .id
    }

    /// Add `quantity` of `product` to the user's cart.
    pub async fn add_to_cart(&self, user: UserId, product: ProductId, quantity: i64) {
        CartService::new(&self.storage)
            .add(user, product, quantity)
            .await
            .unwrap();
    }

    pub async fn get_product(&self, id: ProductId) -> Product {
        CatalogService::new(&self.storage).get(id).await.unwrap()
    }

    pub async fn stock(&self, id: ProductId) -> i32 {
        self.get_product(id).await.stock
    }

    pub async fn cart_count(&self, user: UserId) -> i64 {
        CartService::new(&self.storage)
            .item_count(user)
            .await
            .unwrap()
    }

    pub async fn order_count(&self, user: UserId) -> usize {
        self.storage.orders.list_for_user(user).await.unwrap().len()
    }
}

/// Admin form fields for a product in the "Groceries" category.
#[must_use]
pub fn product_input(name: &str, price: &str, stock: i32) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        category: "Groceries".to_string(),
        description: String::new(),
        price: price.to_string(),
        stock: stock.to_string(),
        image_url: String::new(),
    }
}
