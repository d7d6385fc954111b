//! Transactional storage for order placement.
//!
//! A [`CheckoutTransaction`] is the unit of atomicity for checkout: every
//! write made through it becomes visible on [`CheckoutTransaction::commit`]
//! or not at all. Dropping a transaction without committing rolls it back.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use supermarket_core::{CartLineId, Money, OrderId, ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::LockedCartLine;

/// Opens checkout transactions.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Begin a transaction.
    async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError>;
}

/// Writes that make up one order placement.
#[async_trait]
pub trait CheckoutTransaction: Send {
    /// Read the user's cart joined with product name, price and stock, locking
    /// every cart row and product row involved until the transaction ends.
    /// Lines come back ordered by product ID.
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<LockedCartLine>, RepositoryError>;

    /// Insert the order header.
    async fn insert_order(
        &mut self,
        user_id: UserId,
        total: Money,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderId, RepositoryError>;

    /// Insert one order line with the name and price snapshot from `line`.
    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &LockedCartLine,
    ) -> Result<(), RepositoryError>;

    /// Take `quantity` units out of stock.
    ///
    /// Returns `RepositoryError::Conflict` if stock is lower than `quantity`.
    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError>;

    /// Delete one of the user's cart lines.
    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError>;

    /// Make every write visible.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// `PostgreSQL` checkout using `SELECT ... FOR UPDATE` row locks.
#[derive(Debug, Clone)]
pub struct PgCheckoutStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgCheckoutStore {
    /// Create a new checkout store. `lock_timeout` bounds each wait for a row lock.
    #[must_use]
    pub const fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Scoped to this transaction only.
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgCheckoutTransaction { tx }))
    }
}

struct PgCheckoutTransaction {
    tx: Transaction<'static, Postgres>,
}

#[derive(Debug, sqlx::FromRow)]
struct LockedLineRow {
    line_id: i64,
    product_id: i64,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    stock: i32,
}

impl TryFrom<LockedLineRow> for LockedCartLine {
    type Error = RepositoryError;

    fn try_from(row: LockedLineRow) -> Result<Self, Self::Error> {
        let line_id = row.line_id;
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("cart line {line_id}: {e}"))
        };
        Ok(Self {
            line_id: CartLineId::new(line_id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            unit_price: Money::new(row.unit_price).map_err(|e| corrupt(&e))?,
            quantity: Quantity::try_from(row.quantity).map_err(|e| corrupt(&e))?,
            stock: row.stock,
        })
    }
}

#[async_trait]
impl CheckoutTransaction for PgCheckoutTransaction {
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<LockedCartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, LockedLineRow>(
            r"
            SELECT c.id AS line_id, p.id AS product_id, p.name AS product_name,
                   p.price AS unit_price, c.quantity, p.stock
            FROM storefront.cart_line c
            JOIN storefront.product p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY p.id
            FOR UPDATE OF c, p
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(LockedCartLine::try_from).collect()
    }

    async fn insert_order(
        &mut self,
        user_id: UserId,
        total: Money,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderId, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO storefront."order" (user_id, total, created_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(total)
        .bind(placed_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(OrderId::new(id))
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &LockedCartLine,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.order_line
                (order_id, product_id, product_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            ",
        )
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "stock of product {product_id} is below {quantity}"
            )));
        }
        Ok(())
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_line WHERE id = $1 AND user_id = $2")
            .bind(line_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
