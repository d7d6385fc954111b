//! Cart domain types.

use supermarket_core::{CartLineId, Money, ProductId, Quantity, UserId};

/// One (user, product) entry in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// A cart line joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineView {
    pub line_id: CartLineId,
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: Quantity,
    /// Current stock of the product, for display only.
    pub stock: i32,
}

impl CartLineView {
    /// `quantity * unit_price` at the current price.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// Whether current stock covers this line.
    #[must_use]
    pub fn stock_covers(&self) -> bool {
        i64::from(self.quantity.get()) <= i64::from(self.stock)
    }
}
