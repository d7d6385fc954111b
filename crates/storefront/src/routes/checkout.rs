//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::routes::NavView;
use crate::services::{CheckoutError, CheckoutService, CheckoutSummary};
use crate::state::AppState;

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub nav: NavView,
    pub summary: CheckoutSummary,
    pub error: Option<String>,
}

async fn render(
    state: &AppState,
    user: &CurrentUser,
    error: Option<String>,
) -> Result<CheckoutTemplate, AppError> {
    let summary = CheckoutService::new(state.storage()).summary(user.id).await?;
    Ok(CheckoutTemplate {
        nav: NavView::load(state, Some(user)).await,
        summary,
        error,
    })
}

/// Display the checkout summary.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    let page = render(&state, &user, None).await?;
    if page.summary.is_empty() {
        return Ok(Redirect::to("/cart?error=empty_cart").into_response());
    }
    Ok(page.into_response())
}

/// Place the order and go to the order history.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Response, AppError> {
    match CheckoutService::new(state.storage()).place_order(user.id).await {
        Ok(placed) => {
            add_breadcrumb(
                "checkout",
                "Order placed",
                Some(&[("order_id", &placed.order_id.to_string())]),
            );
            Ok(Redirect::to(&format!("/orders?placed={}", placed.order_id)).into_response())
        }
        Err(CheckoutError::EmptyCart) => Ok(Redirect::to("/cart?error=empty_cart").into_response()),
        Err(e @ (CheckoutError::InsufficientStock { .. } | CheckoutError::TotalTooLarge(_))) => {
            let page = render(&state, &user, Some(e.to_string())).await?;
            Ok((StatusCode::CONFLICT, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
