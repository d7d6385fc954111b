//! Cart merging and ownership, catalog validation and listing.

#![allow(clippy::unwrap_used)]

use supermarket_core::{CartLineId, ProductId};
use supermarket_integration_tests::{Shop, product_input};
use supermarket_storefront::models::{ProductFilter, ProductInput};
use supermarket_storefront::services::{CartError, CartService, CatalogError, CatalogService};

#[tokio::test]
async fn test_adding_same_product_merges_lines() {
    let shop = Shop::new();
    let user = shop.customer("amy@example.com").await;
    let pears = shop.product("Pears", "0.60", 20).await;

    shop.add_to_cart(user, pears, 2).await;
    shop.add_to_cart(user, pears, 3).await;

    let lines = CartService::new(&shop.storage).lines(user).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines.first().unwrap().quantity.get(), 5);
}

#[tokio::test]
async fn test_cart_may_exceed_stock_until_checkout() {
    let shop = Shop::new();
    let user = shop.customer("bob@example.com").await;
    let figs = shop.product("Figs", "0.80", 2).await;

    shop.add_to_cart(user, figs, 9).await;

    let lines = CartService::new(&shop.storage).lines(user).await.unwrap();
    let line = lines.first().unwrap();
    assert_eq!(line.quantity.get(), 9);
    assert!(!line.stock_covers());
}

#[tokio::test]
async fn test_non_positive_quantity_rejected() {
    let shop = Shop::new();
    let user = shop.customer("cal@example.com").await;
    let kiwi = shop.product("Kiwi", "0.35", 20).await;
    let carts = CartService::new(&shop.storage);

    for quantity in [0, -1] {
        let err = carts.add(user, kiwi, quantity).await.unwrap_err();
        assert!(matches!(err, CartError::InvalidQuantity(_)));
    }
    assert_eq!(shop.cart_count(user).await, 0);

    let line = carts.add(user, kiwi, 1).await.unwrap();
    let err = carts.update_quantity(user, line.id, 0).await.unwrap_err();
    assert!(matches!(err, CartError::InvalidQuantity(_)));
    assert_eq!(shop.cart_count(user).await, 1);
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let shop = Shop::new();
    let user = shop.customer("dee@example.com").await;

    let err = CartService::new(&shop.storage)
        .add(user, ProductId::new(999), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::ProductNotFound(id) if id == ProductId::new(999)));
}

#[tokio::test]
async fn test_other_users_line_is_not_found() {
    let shop = Shop::new();
    let owner = shop.customer("eli@example.com").await;
    let intruder = shop.customer("fin@example.com").await;
    let plums = shop.product("Plums", "0.30", 20).await;
    let carts = CartService::new(&shop.storage);
    let line = carts.add(owner, plums, 4).await.unwrap();

    let err = carts
        .update_quantity(intruder, line.id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::LineNotFound(_)));

    let err = carts.remove(intruder, line.id).await.unwrap_err();
    assert!(matches!(err, CartError::LineNotFound(_)));

    assert_eq!(shop.cart_count(owner).await, 4);
}

#[tokio::test]
async fn test_update_and_remove_own_line() {
    let shop = Shop::new();
    let user = shop.customer("gia@example.com").await;
    let limes = shop.product("Limes", "0.25", 20).await;
    let carts = CartService::new(&shop.storage);
    let line = carts.add(user, limes, 1).await.unwrap();

    carts.update_quantity(user, line.id, 6).await.unwrap();
    assert_eq!(shop.cart_count(user).await, 6);

    carts.remove(user, line.id).await.unwrap();
    assert_eq!(shop.cart_count(user).await, 0);

    let err = carts.remove(user, line.id).await.unwrap_err();
    assert!(matches!(err, CartError::LineNotFound(id) if id == line.id));
    let err = carts
        .remove(user, CartLineId::new(12_345))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::LineNotFound(_)));
}

#[tokio::test]
async fn test_deleting_product_removes_it_from_carts() {
    let shop = Shop::new();
    let user = shop.customer("hux@example.com").await;
    let kale = shop.product("Kale", "1.10", 5).await;
    shop.add_to_cart(user, kale, 2).await;

    CatalogService::new(&shop.storage).delete(kale).await.unwrap();

    assert_eq!(shop.cart_count(user).await, 0);
}

#[tokio::test]
async fn test_invalid_product_reports_every_field() {
    let shop = Shop::new();
    let catalog = CatalogService::new(&shop.storage);

    let input = ProductInput {
        name: "   ".to_string(),
        category: String::new(),
        price: "-2".to_string(),
        stock: "lots".to_string(),
        ..ProductInput::default()
    };
    let err = catalog.create(&input).await.unwrap_err();

    let CatalogError::Invalid(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    for field in ["name", "category", "price", "stock"] {
        assert!(errors.has(field), "missing error for {field}");
    }
    assert!(catalog.list(&ProductFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_missing_product() {
    let shop = Shop::new();
    let err = CatalogService::new(&shop.storage)
        .update(ProductId::new(42), &product_input("Ghost", "1.00", 1))
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[tokio::test]
async fn test_listing_filters_by_name_and_category() {
    let shop = Shop::new();
    let catalog = CatalogService::new(&shop.storage);
    for (name, category) in [
        ("Green Apples", "Fruit"),
        ("Apple Juice", "Drinks"),
        ("Bananas", "Fruit"),
    ] {
        let mut input = product_input(name, "1.00", 10);
        input.category = category.to_string();
        catalog.create(&input).await.unwrap();
    }

    let names = |products: Vec<supermarket_storefront::models::Product>| {
        products.into_iter().map(|p| p.name).collect::<Vec<_>>()
    };

    let all = catalog.list(&ProductFilter::default()).await.unwrap();
    assert_eq!(names(all), ["Apple Juice", "Bananas", "Green Apples"]);

    let apples = catalog
        .list(&ProductFilter::from_query(Some("APPLE"), None))
        .await
        .unwrap();
    assert_eq!(names(apples), ["Apple Juice", "Green Apples"]);

    let fruit_apples = catalog
        .list(&ProductFilter::from_query(Some("apple"), Some("Fruit")))
        .await
        .unwrap();
    assert_eq!(names(fruit_apples), ["Green Apples"]);

    assert_eq!(catalog.categories().await.unwrap(), ["Drinks", "Fruit"]);
}
