//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (newest products)
//! GET  /static/app.css            - Stylesheet
//!
//! # Products
//! GET  /products?q=&category=     - Product listing and search
//!
//! # Cart (requires auth)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add or increment a line
//! POST /cart/update               - Change a line's quantity
//! POST /cart/remove               - Remove a line
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Checkout summary
//! POST /checkout/place            - Place order
//!
//! # Orders (requires auth)
//! GET  /orders                    - Order history
//!
//! # Auth (rate limited)
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action
//! POST /auth/logout               - Logout action
//!
//! # Admin (requires admin role)
//! GET  /admin/products            - Product table
//! GET  /admin/products/new        - New product form
//! POST /admin/products/new        - Create product
//! GET  /admin/products/{id}/edit  - Edit product form
//! POST /admin/products/{id}/edit  - Update product
//! POST /admin/products/{id}/delete - Delete product
//! ```
//!
//! Form handlers redirect with an `?error=` code on user mistakes; see
//! [`error_message`] for the codes.

pub mod admin;
pub mod assets;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::auth_rate_limiter;
use crate::models::CurrentUser;
use crate::services::CartService;
use crate::state::AppState;
use supermarket_core::AdminCapability;

/// Query parameters for error display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// User-facing text for an `?error=` code. Unknown codes show nothing.
#[must_use]
pub fn error_message(code: Option<&str>) -> Option<String> {
    let message = match code? {
        "credentials" => "Invalid email or password.",
        "session" => "Could not start your session. Please try again.",
        "exists" => "An account with this email already exists.",
        "name" => "Please enter a name of at least 2 characters.",
        "email" => "Please enter a valid email address.",
        "password" => "Password must be at least 6 characters.",
        "mismatch" => "Passwords do not match.",
        "quantity" => "Quantity must be a whole number of at least 1.",
        "product" => "That product is no longer available.",
        "line" => "That item is no longer in your cart.",
        "empty_cart" => "Your cart is empty.",
        _ => return None,
    };
    Some(message.to_string())
}

/// Navigation bar data shared by every page.
#[derive(Debug, Clone, Default)]
pub struct NavView {
    pub user_name: Option<String>,
    pub is_admin: bool,
    pub cart_count: i64,
}

impl NavView {
    /// Build the navigation bar for `user`.
    ///
    /// A failed cart count is logged and shown as zero rather than failing
    /// the page.
    pub async fn load(state: &AppState, user: Option<&CurrentUser>) -> Self {
        let Some(user) = user else {
            return Self::default();
        };

        let cart_count = match CartService::new(state.storage()).item_count(user.id).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user.id, "cart count unavailable");
                0
            }
        };

        Self {
            user_name: Some(user.name.clone()),
            is_admin: user.is_admin(),
            cart_count,
        }
    }
}

/// Parse an integer form field. Blank gives `default`; garbage gives 0, which
/// every quantity check rejects.
pub(crate) fn parse_quantity(raw: &str, default: i64) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return default;
    }
    raw.parse().unwrap_or(0)
}

/// Parse an ID form field.
pub(crate) fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/place", post(checkout::place))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::index))
        .route("/products/new", get(admin::new_form).post(admin::create))
        .route("/products/{id}/edit", get(admin::edit_form).post(admin::update))
        .route("/products/{id}/delete", post(admin::delete))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/static/app.css", get(assets::stylesheet))
        .route("/products", get(products::index))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/orders", get(orders::index))
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
}
