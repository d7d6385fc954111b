//! Order placement outcomes against the in-memory backend.

#![allow(clippy::unwrap_used)]

use supermarket_core::Money;
use supermarket_integration_tests::{Shop, product_input};
use supermarket_storefront::services::{CatalogService, CheckoutError, CheckoutService};

#[tokio::test]
async fn test_short_line_rejects_whole_order() {
    let shop = Shop::new();
    let user = shop.customer("ana@example.com").await;
    let a = shop.product("Apples", "2.50", 5).await;
    let b = shop.product("Bread", "1.00", 1).await;
    shop.add_to_cart(user, a, 2).await;
    shop.add_to_cart(user, b, 3).await;

    let err = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock {
            product_id,
            requested,
            available,
            ..
        } => {
            assert_eq!(product_id, b);
            assert_eq!(requested.get(), 3);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(shop.order_count(user).await, 0);
    assert_eq!(shop.stock(a).await, 5);
    assert_eq!(shop.stock(b).await, 1);
    assert_eq!(shop.cart_count(user).await, 5);
}

#[tokio::test]
async fn test_order_placed_and_cart_emptied() {
    let shop = Shop::new();
    let user = shop.customer("ben@example.com").await;
    let a = shop.product("Apples", "2.50", 5).await;
    shop.add_to_cart(user, a, 2).await;

    let placed = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap();

    assert_eq!(placed.total, Money::parse("5.00").unwrap());
    assert_eq!(placed.line_count, 1);
    assert_eq!(shop.stock(a).await, 3);
    assert_eq!(shop.cart_count(user).await, 0);

    let orders = shop.storage.orders.list_for_user(user).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = orders.first().unwrap();
    assert_eq!(order.order.id, placed.order_id);
    assert_eq!(order.order.total, placed.total);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines.first().unwrap().quantity.get(), 2);
}

#[tokio::test]
async fn test_empty_cart_changes_nothing() {
    let shop = Shop::new();
    let user = shop.customer("cat@example.com").await;

    let err = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert_eq!(shop.order_count(user).await, 0);
}

#[tokio::test]
async fn test_total_is_sum_of_line_totals() {
    let shop = Shop::new();
    let user = shop.customer("dan@example.com").await;
    let milk = shop.product("Milk", "1.65", 10).await;
    let eggs = shop.product("Eggs", "3.20", 10).await;
    let rice = shop.product("Rice", "0.99", 10).await;
    shop.add_to_cart(user, milk, 3).await;
    shop.add_to_cart(user, eggs, 1).await;
    shop.add_to_cart(user, rice, 7).await;

    let placed = CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap();

    // 4.95 + 3.20 + 6.93
    assert_eq!(placed.total, Money::parse("15.08").unwrap());

    let orders = shop.storage.orders.list_for_user(user).await.unwrap();
    let order = orders.first().unwrap();
    let line_sum: Money = order.lines.iter().map(|l| l.line_total()).sum();
    assert_eq!(line_sum, order.order.total);
}

#[tokio::test]
async fn test_last_unit_goes_to_exactly_one_buyer() {
    let shop = Shop::new();
    let first = shop.customer("eve@example.com").await;
    let second = shop.customer("fay@example.com").await;
    let c = shop.product("Coffee", "4.50", 1).await;
    shop.add_to_cart(first, c, 1).await;
    shop.add_to_cart(second, c, 1).await;

    let checkout = CheckoutService::new(&shop.storage);
    let (r1, r2) = tokio::join!(checkout.place_order(first), checkout.place_order(second));

    let outcomes = [r1, r2];
    let placed = outcomes.iter().filter(|r| r.is_ok()).count();
    let short = outcomes
        .iter()
        .filter(|r| matches!(r, Err(CheckoutError::InsufficientStock { .. })))
        .count();
    assert_eq!(placed, 1);
    assert_eq!(short, 1);
    assert_eq!(shop.stock(c).await, 0);
}

#[tokio::test]
async fn test_stock_never_negative_under_contention() {
    let shop = Shop::new();
    let c = shop.product("Truffle Oil", "12.00", 3).await;

    let mut users = Vec::new();
    for i in 0..10 {
        let user = shop.customer(&format!("buyer{i}@example.com")).await;
        shop.add_to_cart(user, c, 1).await;
        users.push(user);
    }

    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let storage = shop.storage.clone();
            tokio::spawn(async move { CheckoutService::new(&storage).place_order(user).await })
        })
        .collect();

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(CheckoutError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(placed, 3);
    assert_eq!(shop.stock(c).await, 0);
}

#[tokio::test]
async fn test_order_keeps_price_and_name_after_product_edit() {
    let shop = Shop::new();
    let user = shop.customer("gus@example.com").await;
    let tea = shop.product("Green Tea", "3.00", 10).await;
    shop.add_to_cart(user, tea, 2).await;

    CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap();

    CatalogService::new(&shop.storage)
        .update(tea, &product_input("Jasmine Tea", "4.25", 8))
        .await
        .unwrap();

    let orders = shop.storage.orders.list_for_user(user).await.unwrap();
    let line = orders.first().unwrap().lines.first().unwrap().clone();
    assert_eq!(line.unit_price, Money::parse("3.00").unwrap());
    assert_eq!(line.product_name, "Green Tea");
    assert_eq!(line.product_id, Some(tea));
    assert_eq!(
        orders.first().unwrap().order.total,
        Money::parse("6.00").unwrap()
    );
}

#[tokio::test]
async fn test_order_survives_product_deletion() {
    let shop = Shop::new();
    let user = shop.customer("hal@example.com").await;
    let jam = shop.product("Jam", "2.20", 4).await;
    shop.add_to_cart(user, jam, 1).await;

    CheckoutService::new(&shop.storage)
        .place_order(user)
        .await
        .unwrap();
    CatalogService::new(&shop.storage).delete(jam).await.unwrap();

    let orders = shop.storage.orders.list_for_user(user).await.unwrap();
    let line = orders.first().unwrap().lines.first().unwrap().clone();
    assert_eq!(line.product_id, None);
    assert_eq!(line.product_name, "Jam");
}

#[tokio::test]
async fn test_checkout_only_touches_own_cart() {
    let shop = Shop::new();
    let buyer = shop.customer("ivy@example.com").await;
    let other = shop.customer("jon@example.com").await;
    let oats = shop.product("Oats", "1.40", 10).await;
    shop.add_to_cart(buyer, oats, 2).await;
    shop.add_to_cart(other, oats, 4).await;

    CheckoutService::new(&shop.storage)
        .place_order(buyer)
        .await
        .unwrap();

    assert_eq!(shop.cart_count(buyer).await, 0);
    assert_eq!(shop.cart_count(other).await, 4);
    assert_eq!(shop.order_count(other).await, 0);
    assert_eq!(shop.stock(oats).await, 8);
}

#[tokio::test]
async fn test_summary_flags_short_lines() {
    let shop = Shop::new();
    let user = shop.customer("kim@example.com").await;
    let a = shop.product("Apples", "2.50", 5).await;
    let b = shop.product("Bread", "1.00", 1).await;
    shop.add_to_cart(user, a, 2).await;
    shop.add_to_cart(user, b, 3).await;

    let summary = CheckoutService::new(&shop.storage)
        .summary(user)
        .await
        .unwrap();

    assert_eq!(summary.total, Money::parse("8.00").unwrap());
    assert!(!summary.can_place());
    let short: Vec<_> = summary
        .lines
        .iter()
        .filter(|l| !l.sufficient_stock)
        .map(|l| l.line.product_id)
        .collect();
    assert_eq!(short, vec![b]);
}
