//! Storage failures part way through a checkout leave no partial order.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use supermarket_core::{CartLineId, Money, OrderId, ProductId, Quantity, UserId};
use supermarket_integration_tests::Shop;
use supermarket_storefront::db::{CheckoutStore, CheckoutTransaction, MemoryStore, RepositoryError};
use supermarket_storefront::models::LockedCartLine;
use supermarket_storefront::services::{CheckoutError, CheckoutService};

/// Which transaction step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailAt {
    /// The second `decrement_stock` call.
    SecondDecrement,
    /// The first `delete_cart_line` call.
    DeleteCartLine,
    Commit,
}

/// Wraps the in-memory checkout and injects one failure.
struct FaultyCheckout {
    inner: MemoryStore,
    fail_at: FailAt,
}

#[async_trait]
impl CheckoutStore for FaultyCheckout {
    async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError> {
        Ok(Box::new(FaultyTransaction {
            inner: self.inner.begin().await?,
            fail_at: self.fail_at,
            decrements: 0,
        }))
    }
}

struct FaultyTransaction {
    inner: Box<dyn CheckoutTransaction>,
    fail_at: FailAt,
    decrements: usize,
}

fn injected() -> RepositoryError {
    RepositoryError::Unavailable("injected failure".to_string())
}

#[async_trait]
impl CheckoutTransaction for FaultyTransaction {
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<LockedCartLine>, RepositoryError> {
        self.inner.lock_cart(user_id).await
    }

    async fn insert_order(
        &mut self,
        user_id: UserId,
        total: Money,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderId, RepositoryError> {
        self.inner.insert_order(user_id, total, placed_at).await
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &LockedCartLine,
    ) -> Result<(), RepositoryError> {
        self.inner.insert_order_line(order_id, line).await
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        self.decrements += 1;
        if self.fail_at == FailAt::SecondDecrement && self.decrements == 2 {
            return Err(injected());
        }
        self.inner.decrement_stock(product_id, quantity).await
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError> {
        if self.fail_at == FailAt::DeleteCartLine {
            return Err(injected());
        }
        self.inner.delete_cart_line(user_id, line_id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        if self.fail_at == FailAt::Commit {
            return self.inner.rollback().await.and(Err(injected()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.inner.rollback().await
    }
}

/// A shop whose checkout fails at `fail_at`, with a two-line cart.
async fn faulty_shop(fail_at: FailAt) -> (Shop, UserId, ProductId, ProductId) {
    let mut shop = Shop::new();
    shop.storage.checkout = Arc::new(FaultyCheckout {
        inner: shop.memory.clone(),
        fail_at,
    });

    let user = shop.customer("lee@example.com").await;
    let a = shop.product("Apples", "2.50", 5).await;
    let b = shop.product("Bread", "1.00", 4).await;
    shop.add_to_cart(user, a, 2).await;
    shop.add_to_cart(user, b, 1).await;
    (shop, user, a, b)
}

async fn assert_untouched(shop: &Shop, user: UserId, a: ProductId, b: ProductId) {
    assert_eq!(shop.order_count(user).await, 0);
    assert_eq!(shop.stock(a).await, 5);
    assert_eq!(shop.stock(b).await, 4);
    assert_eq!(shop.cart_count(user).await, 3);
}

#[tokio::test]
async fn test_failure_after_first_decrement_rolls_back() {
    let (shop, user, a, b) = faulty_shop(FailAt::SecondDecrement).await;

    let err = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Repository(ref e) if e.is_transient()));
    assert_untouched(&shop, user, a, b).await;
}

#[tokio::test]
async fn test_failure_clearing_cart_rolls_back() {
    let (shop, user, a, b) = faulty_shop(FailAt::DeleteCartLine).await;

    let err = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Repository(_)));
    assert_untouched(&shop, user, a, b).await;
}

#[tokio::test]
async fn test_failed_commit_writes_nothing() {
    let (shop, user, a, b) = faulty_shop(FailAt::Commit).await;

    let err = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Repository(_)));
    assert_untouched(&shop, user, a, b).await;
}

#[tokio::test]
async fn test_store_usable_after_failed_checkout() {
    let (mut shop, user, a, b) = faulty_shop(FailAt::Commit).await;

    CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap_err();

    // Lock released: a healthy checkout over the same data succeeds.
    shop.storage.checkout = Arc::new(shop.memory.clone());
    let placed = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap();

    assert_eq!(placed.total, Money::parse("6.00").unwrap());
    assert_eq!(shop.stock(a).await, 3);
    assert_eq!(shop.stock(b).await, 3);
}
