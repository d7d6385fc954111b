//! Cart route handlers.
//!
//! Every form posts back and redirects: to the cart on success, or to the
//! page the form lives on with an `?error=` code.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use supermarket_core::{CartLineId, Money, ProductId};

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CartLineView;
use crate::routes::{MessageQuery, NavView, error_message, parse_id, parse_quantity};
use crate::services::{CartError, CartService};
use crate::state::AppState;

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: String,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    #[serde(default)]
    pub line_id: String,
    #[serde(default)]
    pub quantity: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    #[serde(default)]
    pub line_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub nav: NavView,
    pub lines: Vec<CartLineView>,
    pub total: Money,
    pub error: Option<String>,
}

/// Where a cart error sends the user, or the server error it really is.
fn cart_redirect(err: CartError) -> Result<Redirect, AppError> {
    match err {
        CartError::InvalidQuantity(_) => Ok(Redirect::to("/cart?error=quantity")),
        CartError::ProductNotFound(_) => Ok(Redirect::to("/products?error=product")),
        CartError::LineNotFound(_) => Ok(Redirect::to("/cart?error=line")),
        CartError::Repository(e) => Err(e.into()),
    }
}

/// Display the cart page.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let lines = CartService::new(state.storage()).lines(user.id).await?;
    let total = lines.iter().map(CartLineView::line_total).sum();

    Ok(CartTemplate {
        nav: NavView::load(&state, Some(&user)).await,
        lines,
        total,
        error: error_message(query.error.as_deref()),
    })
}

/// Add a product to the cart. A blank quantity means one.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect, AppError> {
    let Some(product_id) = parse_id(&form.product_id) else {
        return Ok(Redirect::to("/products?error=product"));
    };
    let quantity = parse_quantity(&form.quantity, 1);

    match CartService::new(state.storage())
        .add(user.id, ProductId::new(product_id), quantity)
        .await
    {
        Ok(_) => {
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", &product_id.to_string())]),
            );
            Ok(Redirect::to("/cart"))
        }
        Err(CartError::InvalidQuantity(_)) => Ok(Redirect::to("/products?error=quantity")),
        Err(e) => cart_redirect(e),
    }
}

/// Change a line's quantity.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect, AppError> {
    let Some(line_id) = parse_id(&form.line_id) else {
        return Ok(Redirect::to("/cart?error=line"));
    };
    let quantity = parse_quantity(&form.quantity, 0);

    match CartService::new(state.storage())
        .update_quantity(user.id, CartLineId::new(line_id), quantity)
        .await
    {
        Ok(()) => Ok(Redirect::to("/cart")),
        Err(e) => cart_redirect(e),
    }
}

/// Remove a line.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect, AppError> {
    let Some(line_id) = parse_id(&form.line_id) else {
        return Ok(Redirect::to("/cart?error=line"));
    };

    match CartService::new(state.storage())
        .remove(user.id, CartLineId::new(line_id))
        .await
    {
        Ok(()) => Ok(Redirect::to("/cart")),
        Err(e) => cart_redirect(e),
    }
}
