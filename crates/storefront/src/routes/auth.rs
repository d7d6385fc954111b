//! Authentication route handlers.
//!
//! Login, registration and logout. A successful login or registration puts a
//! [`CurrentUser`] in the session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::routes::{MessageQuery, NavView, error_message};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: NavView,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub nav: NavView,
    pub error: Option<String>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Error code for a failed registration, or the server error it really is.
fn register_error_code(err: AuthError) -> Result<&'static str, AppError> {
    match err {
        AuthError::InvalidName(_) => Ok("name"),
        AuthError::InvalidEmail(_) => Ok("email"),
        AuthError::WeakPassword(_) => Ok("password"),
        AuthError::UserAlreadyExists => Ok("exists"),
        other => Err(other.into()),
    }
}

/// Put `user` in the session. On failure the user is sent back to `retry`.
async fn start_session(session: &Session, user: &User, retry: &str) -> Response {
    let current = CurrentUser::from(user);
    if let Err(e) = set_current_user(session, &current).await {
        tracing::error!(error = %e, "failed to set session");
        return Redirect::to(&format!("{retry}?error=session")).into_response();
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Redirect::to("/").into_response()
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        nav: NavView::load(&state, user.as_ref()).await,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let auth = AuthService::new(state.storage().users.as_ref(), &state.config().admin_email);

    match auth.login(&form.email, &form.password).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user logged in");
            Ok(start_session(&session, &user, "/auth/login").await)
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("login failed");
            Ok(Redirect::to("/auth/login?error=credentials").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        nav: NavView::load(&state, user.as_ref()).await,
        error: error_message(query.error.as_deref()),
    }
}

/// Handle registration form submission. The new user is logged in straight away.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if form.password != form.password_confirm {
        return Ok(Redirect::to("/auth/register?error=mismatch").into_response());
    }

    let auth = AuthService::new(state.storage().users.as_ref(), &state.config().admin_email);

    match auth.register(&form.name, &form.email, &form.password).await {
        Ok(user) => Ok(start_session(&session, &user, "/auth/login").await),
        Err(e) => {
            let code = register_error_code(e)?;
            Ok(Redirect::to(&format!("/auth/register?error={code}")).into_response())
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "failed to clear session");
    }
    clear_sentry_user();

    Redirect::to("/")
}
