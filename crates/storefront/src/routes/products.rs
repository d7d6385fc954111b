//! Product listing and search.

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
use crate::middleware::OptionalAuth;
use crate::models::{Product, ProductFilter};
use crate::routes::{NavView, error_message};
use crate::services::CatalogService;
use crate::state::AppState;

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub error: Option<String>,
}

/// A category in the filter dropdown.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub name: String,
    pub selected: bool,
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsTemplate {
    pub nav: NavView,
    pub products: Vec<Product>,
    pub categories: Vec<CategoryOption>,
    pub q: String,
    pub category: String,
    pub logged_in: bool,
    pub error: Option<String>,
}

/// List products, optionally filtered by name and category.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ProductFilter::from_query(query.q.as_deref(), query.category.as_deref());
    let catalog = CatalogService::new(state.storage());
    let products = catalog.list(&filter).await?;
    let categories = catalog
        .categories()
        .await?
        .into_iter()
        .map(|name| CategoryOption {
            selected: filter.category.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();

    Ok(ProductsTemplate {
        nav: NavView::load(&state, user.as_ref()).await,
        products,
        categories,
        q: filter.name_contains.unwrap_or_default(),
        category: filter.category.unwrap_or_default(),
        logged_in: user.is_some(),
        error: error_message(query.error.as_deref()),
    })
}
