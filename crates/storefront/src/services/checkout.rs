//! Order placement.
//!
//! `place_order` runs entirely inside one [`CheckoutTransaction`]: the cart and
//! product rows are locked first, the order is validated against what the
//! lock observed, and every write (order, lines, stock, cart) commits
//! together or not at all.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use supermarket_core::{Money, MoneyError, ProductId, Quantity, UserId};

use crate::db::{CartStore, CheckoutStore, CheckoutTransaction, RepositoryError, Storage};
use crate::models::{CartLineView, LockedCartLine, PlacedOrder};

/// Why an order could not be placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A line asks for more units than are in stock.
    #[error("only {available} of {product_name} in stock, {requested} requested")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        requested: Quantity,
        available: i32,
    },

    /// The order total does not fit the ledger.
    #[error("order total is too large: {0}")]
    TotalTooLarge(MoneyError),

    /// Storage failure.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Validated order contents, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub lines: Vec<LockedCartLine>,
    pub total: Money,
}

/// Check locked cart lines against stock and compute the order total.
///
/// Lines are checked in the order given; the first one asking for more than
/// its stock is reported.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` if `lines` is empty.
/// Returns `CheckoutError::InsufficientStock` for the first short line.
/// Returns `CheckoutError::TotalTooLarge` if a line or the total overflows.
pub fn plan_order(lines: &[LockedCartLine]) -> Result<OrderPlan, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    if let Some(short) = lines.iter().find(|l| l.quantity.get() > l.stock) {
        return Err(CheckoutError::InsufficientStock {
            product_id: short.product_id,
            product_name: short.product_name.clone(),
            requested: short.quantity,
            available: short.stock,
        });
    }

    let total = lines
        .iter()
        .try_fold(Money::ZERO, |acc, l| {
            l.unit_price.checked_times(l.quantity)?.checked_add(acc)
        })
        .map_err(CheckoutError::TotalTooLarge)?;

    Ok(OrderPlan {
        lines: lines.to_vec(),
        total,
    })
}

/// One row of the checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub line: CartLineView,
    pub line_total: Money,
    pub sufficient_stock: bool,
}

/// Read-only preview of what `place_order` would do.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub lines: Vec<CheckoutLine>,
    pub total: Money,
}

impl CheckoutSummary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether every line is currently covered by stock.
    #[must_use]
    pub fn can_place(&self) -> bool {
        !self.is_empty() && self.lines.iter().all(|l| l.sufficient_stock)
    }
}

/// Checkout orchestrator.
pub struct CheckoutService<'a> {
    checkout: &'a dyn CheckoutStore,
    carts: &'a dyn CartStore,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            checkout: storage.checkout.as_ref(),
            carts: storage.carts.as_ref(),
        }
    }

    /// The checkout page: cart lines with totals and stock flags. Takes no locks.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if the cart cannot be read.
    #[instrument(skip(self))]
    pub async fn summary(&self, user_id: UserId) -> Result<CheckoutSummary, CheckoutError> {
        let lines: Vec<CheckoutLine> = self
            .carts
            .list_with_product_info(user_id)
            .await?
            .into_iter()
            .map(|line| CheckoutLine {
                line_total: line.line_total(),
                sufficient_stock: line.stock_covers(),
                line,
            })
            .collect();
        let total = lines.iter().map(|l| l.line_total).sum();

        Ok(CheckoutSummary { lines, total })
    }

    /// Turn the user's cart into an order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines.
    /// Returns `CheckoutError::InsufficientStock` if any line exceeds stock.
    /// Returns `CheckoutError::Repository` on storage failure.
    /// In every error case nothing has been written.
    #[instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.checkout.begin().await?;

        match apply(tx.as_mut(), user_id).await {
            Ok(placed) => {
                tx.commit().await?;
                tracing::info!(
                    user_id = %user_id,
                    order_id = %placed.order_id,
                    total = %placed.total,
                    lines = placed.line_count,
                    "order placed"
                );
                Ok(placed)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "checkout rollback failed");
                }
                match &e {
                    CheckoutError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                        ..
                    } => tracing::info!(
                        user_id = %user_id,
                        product_id = %product_id,
                        requested = %requested,
                        available,
                        "checkout rejected"
                    ),
                    CheckoutError::EmptyCart => {
                        tracing::info!(user_id = %user_id, "checkout rejected: empty cart");
                    }
                    CheckoutError::TotalTooLarge(_) | CheckoutError::Repository(_) => {}
                }
                Err(e)
            }
        }
    }
}

/// Every step between `begin` and `commit`.
async fn apply(
    tx: &mut dyn CheckoutTransaction,
    user_id: UserId,
) -> Result<PlacedOrder, CheckoutError> {
    let locked = tx.lock_cart(user_id).await?;
    let plan = plan_order(&locked)?;

    let order_id = tx.insert_order(user_id, plan.total, Utc::now()).await?;
    for line in &plan.lines {
        tx.insert_order_line(order_id, line).await?;
        tx.decrement_stock(line.product_id, line.quantity).await?;
        tx.delete_cart_line(user_id, line.line_id).await?;
    }

    Ok(PlacedOrder {
        order_id,
        total: plan.total,
        line_count: plan.lines.len(),
    })
}
