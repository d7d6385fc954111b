//! Admin product management.
//!
//! Every handler takes [`RequireAdmin`], so non-admins never reach the
//! catalog writes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use supermarket_core::ProductId;

use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{CurrentUser, FieldError, Product, ProductFilter, ProductInput};
use crate::routes::{MessageQuery, NavView};
use crate::services::{CatalogError, CatalogService};
use crate::state::AppState;

/// Admin product table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/index.html")]
pub struct AdminProductsTemplate {
    pub nav: NavView,
    pub products: Vec<Product>,
    pub notice: Option<String>,
    pub error: Option<String>,
}

/// Create/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub nav: NavView,
    pub title: String,
    pub action: String,
    pub input: ProductInput,
    pub errors: Vec<FieldError>,
}

fn notice_message(code: Option<&str>) -> Option<String> {
    let message = match code? {
        "created" => "Product created.",
        "updated" => "Product updated.",
        "deleted" => "Product deleted.",
        _ => return None,
    };
    Some(message.to_string())
}

async fn form_page(
    state: &AppState,
    user: &CurrentUser,
    product_id: Option<ProductId>,
    input: ProductInput,
    errors: Vec<FieldError>,
) -> ProductFormTemplate {
    let (title, action) = match product_id {
        Some(id) => (
            format!("Edit {}", input.name),
            format!("/admin/products/{id}/edit"),
        ),
        None => ("New product".to_string(), "/admin/products/new".to_string()),
    };

    ProductFormTemplate {
        nav: NavView::load(state, Some(user)).await,
        title,
        action,
        input,
        errors,
    }
}

/// Re-show the form for validation errors, redirect for a vanished product.
async fn write_failed(
    state: &AppState,
    user: &CurrentUser,
    product_id: Option<ProductId>,
    input: ProductInput,
    err: CatalogError,
) -> Result<Response, AppError> {
    match err {
        CatalogError::Invalid(errors) => {
            let page = form_page(state, user, product_id, input, errors.errors).await;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        CatalogError::NotFound(_) => {
            Ok(Redirect::to("/admin/products?error=missing").into_response())
        }
        CatalogError::Repository(e) => Err(e.into()),
    }
}

/// Product table.
#[instrument(skip(state, admin, query), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let products = CatalogService::new(state.storage())
        .list(&ProductFilter::default())
        .await?;

    Ok(AdminProductsTemplate {
        nav: NavView::load(&state, Some(&admin)).await,
        products,
        notice: notice_message(query.notice.as_deref()),
        error: (query.error.as_deref() == Some("missing"))
            .then(|| "That product no longer exists.".to_string()),
    })
}

/// Blank product form.
pub async fn new_form(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> impl IntoResponse {
    form_page(&state, &admin, None, ProductInput::default(), Vec::new()).await
}

/// Create a product.
#[instrument(skip(state, admin, input), fields(user_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(input): Form<ProductInput>,
) -> Result<Response, AppError> {
    match CatalogService::new(state.storage()).create(&input).await {
        Ok(_) => Ok(Redirect::to("/admin/products?notice=created").into_response()),
        Err(e) => write_failed(&state, &admin, None, input, e).await,
    }
}

/// Form prefilled with a product's current values.
#[instrument(skip(state, admin), fields(user_id = %admin.id))]
pub async fn edit_form(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let id = ProductId::new(id);
    match CatalogService::new(state.storage()).get(id).await {
        Ok(product) => {
            let input = ProductInput::from(&product);
            Ok(form_page(&state, &admin, Some(id), input, Vec::new())
                .await
                .into_response())
        }
        Err(CatalogError::NotFound(_)) => {
            Ok(Redirect::to("/admin/products?error=missing").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Overwrite a product.
#[instrument(skip(state, admin, input), fields(user_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
    Form(input): Form<ProductInput>,
) -> Result<Response, AppError> {
    let id = ProductId::new(id);
    match CatalogService::new(state.storage()).update(id, &input).await {
        Ok(_) => Ok(Redirect::to("/admin/products?notice=updated").into_response()),
        Err(e) => write_failed(&state, &admin, Some(id), input, e).await,
    }
}

/// Delete a product.
#[instrument(skip(state, admin), fields(user_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    match CatalogService::new(state.storage())
        .delete(ProductId::new(id))
        .await
    {
        Ok(()) => Ok(Redirect::to("/admin/products?notice=deleted")),
        Err(CatalogError::NotFound(_)) => Ok(Redirect::to("/admin/products?error=missing")),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_message() {
        assert_eq!(
            notice_message(Some("created")).as_deref(),
            Some("Product created.")
        );
        assert_eq!(notice_message(Some("other")), None);
    }
}
