//! Storage for the storefront.
//!
//! # Database schema: `storefront`
//!
//! ## Tables
//!
//! - `user` - Accounts with argon2 password hashes and a role
//! - `product` - The catalog (`CHECK (stock >= 0)`)
//! - `cart_line` - One row per (user, product), `UNIQUE (user_id, product_id)`
//! - `order` - Placed orders, immutable
//! - `order_line` - Order contents with name and price snapshots
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Backends
//!
//! Each store is an `async_trait` trait with two implementations: `Pg*`
//! (sqlx against `PostgreSQL`) and [`memory::MemoryStore`] (one shared
//! `tokio::sync::Mutex`, used by tests and local demos). [`Storage`] bundles
//! one of each behind `Arc<dyn _>`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p supermarket-cli -- migrate
//! ```

pub mod cart;
pub mod checkout;
pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use cart::{CartStore, PgCartStore};
pub use checkout::{CheckoutStore, CheckoutTransaction, PgCheckoutStore};
pub use memory::MemoryStore;
pub use orders::{OrderLedger, PgOrderLedger};
pub use products::{PgProductCatalog, ProductCatalog};
pub use users::{PgUserStore, UserStore};

use crate::config::PoolSettings;

/// `lock_not_available`, raised when `lock_timeout` expires.
const PG_LOCK_NOT_AVAILABLE: &str = "55P03";
/// `deadlock_detected`.
const PG_DEADLOCK_DETECTED: &str = "40P01";
/// `query_canceled`, raised when `statement_timeout` expires.
const PG_QUERY_CANCELED: &str = "57014";
const PG_NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// The database could not be reached or a lock could not be taken in time.
    /// Safe to retry later.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A computed value does not fit its column.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl RepositoryError {
    /// Whether the failure is transient (timeouts, lost connections).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                return Self::Unavailable(error.to_string());
            }
            sqlx::Error::Database(db_err) => {
                if matches!(
                    db_err.code().as_deref(),
                    Some(PG_LOCK_NOT_AVAILABLE | PG_DEADLOCK_DETECTED | PG_QUERY_CANCELED)
                ) {
                    return Self::Unavailable(db_err.message().to_owned());
                }
                if db_err.code().as_deref() == Some(PG_NUMERIC_VALUE_OUT_OF_RANGE) {
                    return Self::OutOfRange(db_err.message().to_owned());
                }
                match db_err.kind() {
                    ErrorKind::UniqueViolation | ErrorKind::CheckViolation => {
                        return Self::Conflict(db_err.message().to_owned());
                    }
                    ErrorKind::ForeignKeyViolation => {
                        return Self::InvalidReference(db_err.message().to_owned());
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        Self::Database(error)
    }
}

/// Create a `PostgreSQL` connection pool.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `settings` - Pool size and acquire timeout
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    settings: &PoolSettings,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(1)
        .acquire_timeout(settings.acquire_timeout)
        .connect(database_url.expose_secret())
        .await
}

/// Run the storefront schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Handles to every store, all backed by the same storage.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderLedger>,
    pub checkout: Arc<dyn CheckoutStore>,
}

impl Storage {
    /// Stores backed by `PostgreSQL`.
    ///
    /// `lock_timeout` bounds how long checkout waits for row locks.
    #[must_use]
    pub fn postgres(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            catalog: Arc::new(PgProductCatalog::new(pool.clone())),
            carts: Arc::new(PgCartStore::new(pool.clone())),
            orders: Arc::new(PgOrderLedger::new(pool.clone())),
            checkout: Arc::new(PgCheckoutStore::new(pool, lock_timeout)),
        }
    }

    /// Stores backed by a fresh in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::from_memory(&MemoryStore::new())
    }

    /// Stores sharing an existing in-memory store.
    #[must_use]
    pub fn from_memory(store: &MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            catalog: Arc::new(store.clone()),
            carts: Arc::new(store.clone()),
            orders: Arc::new(store.clone()),
            checkout: Arc::new(store.clone()),
        }
    }
}
