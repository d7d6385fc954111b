//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::Storage;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store handles and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    storage: Storage,
}

impl AppState {
    /// Create a new application state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let storage = Storage::postgres(pool.clone(), config.checkout_lock_timeout);
        Self::with_storage(config, pool, storage)
    }

    /// Create an application state over explicit stores.
    ///
    /// `pool` is still used for readiness checks and sessions.
    #[must_use]
    pub fn with_storage(config: StorefrontConfig, pool: PgPool, storage: Storage) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                storage,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the store handles.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }
}
