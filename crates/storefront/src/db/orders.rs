//! Order ledger storage (read side).
//!
//! Orders are only ever written by checkout, inside its transaction; see
//! [`super::checkout`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use supermarket_core::{Money, OrderId, OrderLineId, ProductId, Quantity, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderLine, OrderWithLines};

/// Read access to placed orders.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// The user's orders with their lines, newest first.
    async fn list_for_user(&self, user_id: UserId)
    -> Result<Vec<OrderWithLines>, RepositoryError>;
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: i64,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            total: Money::new(row.total).map_err(|e| {
                RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
            })?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: &dyn std::fmt::Display| {
            RepositoryError::DataCorruption(format!("order line {id}: {e}"))
        };
        Ok(Self {
            id: OrderLineId::new(id),
            order_id: OrderId::new(row.order_id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            quantity: Quantity::try_from(row.quantity).map_err(|e| corrupt(&e))?,
            unit_price: Money::new(row.unit_price).map_err(|e| corrupt(&e))?,
        })
    }
}

/// Attach lines to their orders, keeping the order sequence of `orders`.
pub(crate) fn group_lines(orders: Vec<Order>, lines: Vec<OrderLine>) -> Vec<OrderWithLines> {
    let mut by_order: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
    for line in lines {
        by_order.entry(line.order_id).or_default().push(line);
    }
    orders
        .into_iter()
        .map(|order| {
            let lines = by_order.remove(&order.id).unwrap_or_default();
            OrderWithLines { order, lines }
        })
        .collect()
}

/// `PostgreSQL`-backed order ledger.
#[derive(Debug, Clone)]
pub struct PgOrderLedger {
    pool: PgPool,
}

impl PgOrderLedger {
    /// Create a new ledger over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithLines>, RepositoryError> {
        let order_rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, total, created_at
            FROM storefront."order"
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let orders = order_rows
            .into_iter()
            .map(Order::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
        let line_rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT id, order_id, product_id, product_name, quantity, unit_price
            FROM storefront.order_line
            WHERE order_id = ANY($1)
            ORDER BY order_id, id
            ",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .into_iter()
            .map(OrderLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(group_lines(orders, lines))
    }
}
