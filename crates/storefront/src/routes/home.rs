//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::Product;
use crate::routes::NavView;
use crate::services::CatalogService;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: NavView,
    pub products: Vec<Product>,
    pub categories: Vec<String>,
}

/// Display the home page with the newest products.
#[instrument(skip(state, user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let catalog = CatalogService::new(state.storage());
    let products = catalog.featured().await?;
    let categories = catalog.categories().await?;

    Ok(HomeTemplate {
        nav: NavView::load(&state, user.as_ref()).await,
        products,
        categories,
    })
}
