//! Cart service.
//!
//! Quantities arrive from forms as raw integers and are validated here; the
//! store only ever sees a [`Quantity`].

use thiserror::Error;
use tracing::instrument;

use supermarket_core::{CartLineId, ProductId, Quantity, QuantityError, UserId};

use crate::db::{CartStore, RepositoryError, Storage};
use crate::models::{CartLine, CartLineView};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Missing, or owned by another user.
    #[error("cart line {0} not found")]
    LineNotFound(CartLineId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Per-user cart operations.
pub struct CartService<'a> {
    carts: &'a dyn CartStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub fn new(storage: &'a Storage) -> Self {
        Self {
            carts: storage.carts.as_ref(),
        }
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is below 1 or the
    /// merged line would overflow.
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartLine, CartError> {
        let quantity = Quantity::new(quantity)?;
        let line = self
            .carts
            .add_or_increment(user_id, product_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::InvalidReference(_) => CartError::ProductNotFound(product_id),
                RepositoryError::OutOfRange(_) => CartError::InvalidQuantity(
                    QuantityError::TooLarge(i64::from(quantity.get())),
                ),
                other => CartError::Repository(other),
            })?;

        tracing::debug!(line_id = %line.id, quantity = %line.quantity, "cart line saved");
        Ok(line)
    }

    /// Set the quantity of one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` if `quantity` is below 1.
    /// Returns `CartError::LineNotFound` if the user has no such line.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<(), CartError> {
        let quantity = Quantity::new(quantity)?;
        if self.carts.update_quantity(user_id, line_id, quantity).await? {
            Ok(())
        } else {
            Err(CartError::LineNotFound(line_id))
        }
    }

    /// Remove one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the user has no such line.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, line_id: CartLineId) -> Result<(), CartError> {
        if self.carts.remove(user_id, line_id).await? {
            Ok(())
        } else {
            Err(CartError::LineNotFound(line_id))
        }
    }

    /// The user's cart, ordered by product name.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the cart cannot be read.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLineView>, CartError> {
        Ok(self.carts.list_with_product_info(user_id).await?)
    }

    /// Units in the cart, for the navigation badge.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the cart cannot be read.
    pub async fn item_count(&self, user_id: UserId) -> Result<i64, CartError> {
        Ok(self.carts.item_count(user_id).await?)
    }
}
