//! Cart storage.
//!
//! Every operation is scoped by the owning user: a line ID that belongs to
//! somebody else behaves exactly like one that does not exist.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use supermarket_core::{CartLineId, Money, ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::{CartLine, CartLineView};

/// Per-user cart lines.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Create the (user, product) line or add `quantity` to it.
    ///
    /// Returns `RepositoryError::InvalidReference` if the product does not exist
    /// and `RepositoryError::OutOfRange` if the merged quantity overflows.
    async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError>;

    /// Set a line's quantity. Returns whether a line owned by `user_id` was found.
    async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError>;

    /// Delete a line. Returns whether a line owned by `user_id` was found.
    async fn remove(&self, user_id: UserId, line_id: CartLineId) -> Result<bool, RepositoryError>;

    /// The user's lines joined with product details, ordered by product name.
    async fn list_with_product_info(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CartLineView>, RepositoryError>;

    /// Total units across the user's lines.
    async fn item_count(&self, user_id: UserId) -> Result<i64, RepositoryError>;
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i64,
    user_id: i64,
    product_id: i64,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartLineId::new(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            quantity: Quantity::try_from(row.quantity).map_err(|e| {
                RepositoryError::DataCorruption(format!("cart line {}: {e}", row.id))
            })?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineViewRow {
    line_id: i64,
    product_id: i64,
    name: String,
    image_url: Option<String>,
    price: Decimal,
    quantity: i32,
    stock: i32,
}

impl TryFrom<CartLineViewRow> for CartLineView {
    type Error = RepositoryError;

    fn try_from(row: CartLineViewRow) -> Result<Self, Self::Error> {
        let line_id = row.line_id;
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("cart line {line_id}: {e}"))
        };
        Ok(Self {
            line_id: CartLineId::new(line_id),
            product_id: ProductId::new(row.product_id),
            unit_price: Money::new(row.price).map_err(|e| corrupt(&e))?,
            quantity: Quantity::try_from(row.quantity).map_err(|e| corrupt(&e))?,
            name: row.name,
            image_url: row.image_url,
            stock: row.stock,
        })
    }
}

/// `PostgreSQL`-backed cart store.
#[derive(Debug, Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    /// Create a new cart store over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            INSERT INTO storefront.cart_line (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = storefront.cart_line.quantity + EXCLUDED.quantity,
                          updated_at = NOW()
            RETURNING id, user_id, product_id, quantity
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await?;

        CartLine::try_from(row)
    }

    async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart_line
            SET quantity = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(line_id)
        .bind(user_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: UserId, line_id: CartLineId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM storefront.cart_line WHERE id = $1 AND user_id = $2")
                .bind(line_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_with_product_info(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CartLineView>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineViewRow>(
            r"
            SELECT c.id AS line_id, p.id AS product_id, p.name, p.image_url,
                   p.price, c.quantity, p.stock
            FROM storefront.cart_line c
            JOIN storefront.product p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY p.name ASC, c.id ASC
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLineView::try_from).collect()
    }

    async fn item_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM storefront.cart_line WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
