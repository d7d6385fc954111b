//! User role commands.
//!
//! Accounts are created through the storefront's registration page; these
//! commands only change the role of an existing account.

use thiserror::Error;

use supermarket_core::UserRole;
use supermarket_storefront::db::{PgUserStore, RepositoryError, UserStore};
use supermarket_storefront::models::User;

use super::{CommandError, connect};

/// Errors that can occur during role changes.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] supermarket_core::EmailError),

    /// No account uses that email.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Grant the admin role.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses `email`.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let user = set_role(email, UserRole::Admin).await?;
    tracing::info!("{} ({}) is now an admin", user.name, user.email);
    Ok(())
}

/// Revoke the admin role.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account uses `email`.
pub async fn demote(email: &str) -> Result<(), AdminError> {
    let user = set_role(email, UserRole::Customer).await?;
    tracing::info!("{} ({}) is now a customer", user.name, user.email);
    Ok(())
}

async fn set_role(email: &str, role: UserRole) -> Result<User, AdminError> {
    let email = supermarket_core::Email::parse(email)?;
    let users = PgUserStore::new(connect().await?);

    users.set_role(&email, role).await.map_err(|e| match e {
        RepositoryError::NotFound => AdminError::UserNotFound(email.to_string()),
        other => AdminError::Repository(other),
    })
}
