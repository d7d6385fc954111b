//! Order history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::OrderWithLines;
use crate::routes::NavView;
use crate::state::AppState;

/// Order history query string.
#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    /// ID of an order that was just placed.
    pub placed: Option<i64>,
}

/// One order on the history page.
#[derive(Debug, Clone)]
pub struct OrderCard {
    pub order: OrderWithLines,
    /// The order that was just placed.
    pub highlighted: bool,
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersTemplate {
    pub nav: NavView,
    pub orders: Vec<OrderCard>,
    pub just_placed: bool,
}

/// List the user's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<OrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let orders: Vec<OrderCard> = state
        .storage()
        .orders
        .list_for_user(user.id)
        .await?
        .into_iter()
        .map(|order| OrderCard {
            highlighted: query.placed == Some(order.order.id.as_i64()),
            order,
        })
        .collect();

    Ok(OrdersTemplate {
        nav: NavView::load(&state, Some(&user)).await,
        just_placed: orders.iter().any(|o| o.highlighted),
        orders,
    })
}
