//! Register, shop and check out through the full router.
//!
//! Runs against the in-memory stores and an in-memory session store. The
//! `PgPool` in the state is lazy and never connected.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use supermarket_integration_tests::Shop;
use supermarket_storefront::config::StorefrontConfig;
use supermarket_storefront::middleware::create_session_layer;
use supermarket_storefront::models::ProductFilter;
use supermarket_storefront::routes;
use supermarket_storefront::services::CatalogService;
use supermarket_storefront::state::AppState;

const ADMIN_EMAIL: &str = "boss@shop.test";

fn app(shop: &Shop) -> Router {
    let config = StorefrontConfig::from_lookup(|key| match key {
        "STOREFRONT_DATABASE_URL" => Some("postgres://localhost/unused".to_string()),
        "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
        "STOREFRONT_ADMIN_EMAIL" => Some(ADMIN_EMAIL.to_string()),
        _ => None,
    })
    .unwrap();
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap();
    let session_layer = create_session_layer(tower_sessions::MemoryStore::default(), &config);
    let state = AppState::with_storage(config, pool, shop.storage.clone());

    routes::routes().layer(session_layer).with_state(state)
}

/// A browser: one cookie jar against one router.
struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    fn new(shop: &Shop) -> Self {
        Self {
            app: app(shop),
            cookie: None,
        }
    }

    async fn send(&mut self, request: axum::http::request::Builder, body: Body) -> Response {
        let mut request = request.header("x-forwarded-for", "203.0.113.7");
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri), Body::empty()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Response {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(form.to_string())).await
    }

    async fn register(&mut self, name: &str, email: &str) -> Response {
        let form = format!(
            "name={name}&email={}&password=secret123&password_confirm=secret123",
            email.replace('@', "%40")
        );
        self.post("/auth/register", &form).await
    }
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_home_and_listing_render() {
    let shop = Shop::new();
    shop.product("Bananas", "0.25", 100).await;
    let mut client = Client::new(&shop);

    let home = client.get("/").await;
    assert_eq!(home.status(), StatusCode::OK);
    assert!(body_text(home).await.contains("Bananas"));

    let listing = client.get("/products?q=ban").await;
    assert_eq!(listing.status(), StatusCode::OK);
    assert!(body_text(listing).await.contains("Bananas"));
}

#[tokio::test]
async fn test_cart_requires_login() {
    let shop = Shop::new();
    let mut client = Client::new(&shop);

    let response = client.get("/cart").await;
    assert!(response.status().is_redirection());
    assert!(location(&response).starts_with("/auth/login"));
}

#[tokio::test]
async fn test_customer_shops_and_checks_out() {
    let shop = Shop::new();
    let apples = shop.product("Apples", "2.50", 5).await;
    let mut client = Client::new(&shop);

    let registered = client.register("Ana", "ana@example.com").await;
    assert_eq!(location(&registered), "/");
    assert!(client.cookie.is_some());

    let added = client
        .post("/cart/add", &format!("product_id={apples}&quantity=2"))
        .await;
    assert_eq!(location(&added), "/cart");

    let cart = client.get("/cart").await;
    assert_eq!(cart.status(), StatusCode::OK);
    assert!(body_text(cart).await.contains("Apples"));

    let checkout = client.get("/checkout").await;
    assert_eq!(checkout.status(), StatusCode::OK);

    let placed = client.post("/checkout/place", "").await;
    assert!(location(&placed).starts_with("/orders?placed="));
    assert_eq!(shop.stock(apples).await, 3);

    let orders = client.get(location(&placed).to_string().as_str()).await;
    assert_eq!(orders.status(), StatusCode::OK);
    let page = body_text(orders).await;
    assert!(page.contains("Apples"));
    assert!(page.contains("5.00"));
}

#[tokio::test]
async fn test_short_stock_rerenders_checkout_with_conflict() {
    let shop = Shop::new();
    let bread = shop.product("Bread", "1.00", 1).await;
    let mut client = Client::new(&shop);
    client.register("Ben", "ben@example.com").await;
    client
        .post("/cart/add", &format!("product_id={bread}&quantity=3"))
        .await;

    let response = client.post("/checkout/place", "").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(body_text(response).await.contains("Bread"));
    assert_eq!(shop.stock(bread).await, 1);
}

#[tokio::test]
async fn test_empty_cart_checkout_redirects() {
    let shop = Shop::new();
    let mut client = Client::new(&shop);
    client.register("Cat", "cat@example.com").await;

    let response = client.post("/checkout/place", "").await;
    assert_eq!(location(&response), "/cart?error=empty_cart");
}

#[tokio::test]
async fn test_invalid_quantity_is_reported() {
    let shop = Shop::new();
    let figs = shop.product("Figs", "0.80", 10).await;
    let mut client = Client::new(&shop);
    client.register("Dan", "dan@example.com").await;

    let response = client
        .post("/cart/add", &format!("product_id={figs}&quantity=0"))
        .await;
    assert_eq!(location(&response), "/products?error=quantity");
}

#[tokio::test]
async fn test_quantity_overflow_is_reported() {
    let shop = Shop::new();
    let figs = shop.product("Figs", "0.80", 10).await;
    let mut client = Client::new(&shop);
    client.register("Dan", "dan@example.com").await;

    let first = client
        .post("/cart/add", &format!("product_id={figs}&quantity={}", i32::MAX))
        .await;
    assert_eq!(location(&first), "/cart");

    let second = client
        .post("/cart/add", &format!("product_id={figs}&quantity=1"))
        .await;
    assert_eq!(location(&second), "/products?error=quantity");

    let cart = body_text(client.get("/cart").await).await;
    assert!(cart.contains(&i32::MAX.to_string()));
}

#[tokio::test]
async fn test_customer_cannot_reach_admin() {
    let shop = Shop::new();
    let mut client = Client::new(&shop);
    client.register("Eve", "eve@example.com").await;

    let response = client.get("/admin/products").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_admin_creates_product() {
    let shop = Shop::new();
    let mut client = Client::new(&shop);
    client.register("Boss", ADMIN_EMAIL).await;

    let index = client.get("/admin/products").await;
    assert_eq!(index.status(), StatusCode::OK);

    let created = client
        .post(
            "/admin/products/new",
            "name=Oat+Milk&category=Dairy&description=&price=1.95&stock=12&image_url=",
        )
        .await;
    assert_eq!(location(&created), "/admin/products?notice=created");

    let products = CatalogService::new(&shop.storage)
        .list(&ProductFilter::default())
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products.first().unwrap().name, "Oat Milk");

    let invalid = client
        .post(
            "/admin/products/new",
            "name=&category=Dairy&description=&price=abc&stock=1&image_url=",
        )
        .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let too_dear = client
        .post(
            "/admin/products/new",
            "name=Truffle&category=Deli&description=&price=10000000000.00&stock=1&image_url=",
        )
        .await;
    assert_eq!(too_dear.status(), StatusCode::BAD_REQUEST);
}
