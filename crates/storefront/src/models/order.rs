//! Order domain types.
//!
//! Orders and their lines are immutable once written. Each line carries the
//! product name and unit price observed at checkout, so history renders the
//! same after the product is repriced, renamed or deleted.

use chrono::{DateTime, Utc};

use supermarket_core::{CartLineId, Money, OrderId, OrderLineId, ProductId, Quantity, UserId};

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Outcome of a successful checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub total: Money,
    pub line_count: usize,
}

/// A cart line read under row locks during checkout, joined with the
/// product's current name, price and stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedCartLine {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: Quantity,
    pub stock: i32,
}
