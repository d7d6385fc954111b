//! In-memory implementation of every store.
//!
//! All state sits behind one `tokio::sync::Mutex`. Plain store calls hold the
//! lock for the duration of the call. A checkout transaction holds it from
//! `begin` until commit or rollback and works on a staged copy, so concurrent
//! checkouts run one after another and a rolled-back transaction leaves no
//! trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use supermarket_core::{
    CartLineId, Email, Money, OrderId, OrderLineId, ProductId, Quantity, UserId, UserRole,
};

use super::cart::CartStore;
use super::checkout::{CheckoutStore, CheckoutTransaction};
use super::orders::{OrderLedger, group_lines};
use super::products::ProductCatalog;
use super::users::UserStore;
use super::RepositoryError;
use crate::models::{
    CartLine, CartLineView, LockedCartLine, NewUser, Order, OrderLine, OrderWithLines, Product,
    ProductDraft, ProductFilter, User,
};

#[derive(Debug, Clone, Default)]
struct Sequences {
    user: i64,
    product: i64,
    cart_line: i64,
    order: i64,
    order_line: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone, Default)]
struct MemoryData {
    seq: Sequences,
    users: BTreeMap<UserId, StoredUser>,
    products: BTreeMap<ProductId, Product>,
    cart_lines: BTreeMap<CartLineId, CartLine>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: BTreeMap<OrderLineId, OrderLine>,
}

impl MemoryData {
    fn owned_line_mut(&mut self, user_id: UserId, line_id: CartLineId) -> Option<&mut CartLine> {
        self.cart_lines
            .get_mut(&line_id)
            .filter(|line| line.user_id == user_id)
    }

    fn product_draft_into(product: &mut Product, draft: &ProductDraft) {
        product.name.clone_from(&draft.name);
        product.category.clone_from(&draft.category);
        product.description.clone_from(&draft.description);
        product.price = draft.price;
        product.stock = draft.stock;
        product.image_url.clone_from(&draft.image_url);
    }
}

/// In-memory storage shared by every handle cloned from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut data = self.data.lock().await;

        if data.users.values().any(|u| u.user.email == new_user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let id = UserId::new(next(&mut data.seq.user));
        let user = User {
            id,
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            role: new_user.role,
            created_at: Utc::now(),
        };
        data.users.insert(
            id,
            StoredUser {
                user: user.clone(),
                password_hash: new_user.password_hash.clone(),
            },
        );
        Ok(user)
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .users
            .values()
            .find(|u| u.user.email == *email)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.users.get(&id).map(|u| u.user.clone()))
    }

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        let mut data = self.data.lock().await;
        let stored = data
            .users
            .values_mut()
            .find(|u| u.user.email == *email)
            .ok_or(RepositoryError::NotFound)?;
        stored.user.role = role;
        Ok(stored.user.clone())
    }
}

// =============================================================================
// Products
// =============================================================================

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let data = self.data.lock().await;
        let mut products: Vec<Product> = data
            .products
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data.products.get(&id).cloned())
    }

    async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let mut data = self.data.lock().await;
        let id = ProductId::new(next(&mut data.seq.product));
        let product = Product {
            id,
            name: draft.name.clone(),
            category: draft.category.clone(),
            description: draft.description.clone(),
            price: draft.price,
            stock: draft.stock,
            image_url: draft.image_url.clone(),
            created_at: Utc::now(),
        };
        data.products.insert(id, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let mut data = self.data.lock().await;
        let product = data.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        MemoryData::product_draft_into(product, draft);
        Ok(product.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut data = self.data.lock().await;
        if data.products.remove(&id).is_none() {
            return Ok(false);
        }
        data.cart_lines.retain(|_, line| line.product_id != id);
        for line in data.order_lines.values_mut() {
            if line.product_id == Some(id) {
                line.product_id = None;
            }
        }
        Ok(true)
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let data = self.data.lock().await;
        let categories: BTreeSet<&str> = data
            .products
            .values()
            .map(|p| p.category.as_str())
            .collect();
        Ok(categories.into_iter().map(str::to_owned).collect())
    }

    async fn featured(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let data = self.data.lock().await;
        let mut products: Vec<Product> = data.products.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        products.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(products)
    }
}

// =============================================================================
// Carts
// =============================================================================

#[async_trait]
impl CartStore for MemoryStore {
    async fn add_or_increment(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartLine, RepositoryError> {
        let mut data = self.data.lock().await;

        if !data.products.contains_key(&product_id) {
            return Err(RepositoryError::InvalidReference(format!(
                "product {product_id} does not exist"
            )));
        }

        if let Some(line) = data
            .cart_lines
            .values_mut()
            .find(|l| l.user_id == user_id && l.product_id == product_id)
        {
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .map_err(|e| RepositoryError::OutOfRange(e.to_string()))?;
            return Ok(line.clone());
        }

        let id = CartLineId::new(next(&mut data.seq.cart_line));
        let line = CartLine {
            id,
            user_id,
            product_id,
            quantity,
        };
        data.cart_lines.insert(id, line.clone());
        Ok(line)
    }

    async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let mut data = self.data.lock().await;
        Ok(data
            .owned_line_mut(user_id, line_id)
            .map(|line| line.quantity = quantity)
            .is_some())
    }

    async fn remove(&self, user_id: UserId, line_id: CartLineId) -> Result<bool, RepositoryError> {
        let mut data = self.data.lock().await;
        if data.owned_line_mut(user_id, line_id).is_none() {
            return Ok(false);
        }
        Ok(data.cart_lines.remove(&line_id).is_some())
    }

    async fn list_with_product_info(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CartLineView>, RepositoryError> {
        let data = self.data.lock().await;
        let mut lines: Vec<CartLineView> = data
            .cart_lines
            .values()
            .filter(|l| l.user_id == user_id)
            .filter_map(|l| {
                data.products.get(&l.product_id).map(|p| CartLineView {
                    line_id: l.id,
                    product_id: p.id,
                    name: p.name.clone(),
                    image_url: p.image_url.clone(),
                    unit_price: p.price,
                    quantity: l.quantity,
                    stock: p.stock,
                })
            })
            .collect();
        lines.sort_by(|a, b| a.name.cmp(&b.name).then(a.line_id.cmp(&b.line_id)));
        Ok(lines)
    }

    async fn item_count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let data = self.data.lock().await;
        Ok(data
            .cart_lines
            .values()
            .filter(|l| l.user_id == user_id)
            .map(|l| i64::from(l.quantity.get()))
            .sum())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderLedger for MemoryStore {
    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithLines>, RepositoryError> {
        let data = self.data.lock().await;
        let mut orders: Vec<Order> = data
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let lines: Vec<OrderLine> = data
            .order_lines
            .values()
            .filter(|l| orders.iter().any(|o| o.id == l.order_id))
            .cloned()
            .collect();

        Ok(group_lines(orders, lines))
    }
}

// =============================================================================
// Checkout
// =============================================================================

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutTransaction>, RepositoryError> {
        let guard = Arc::clone(&self.data).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryCheckoutTransaction { guard, staged }))
    }
}

/// Holds the store lock for its whole lifetime and writes to `staged`.
struct MemoryCheckoutTransaction {
    guard: OwnedMutexGuard<MemoryData>,
    staged: MemoryData,
}

#[async_trait]
impl CheckoutTransaction for MemoryCheckoutTransaction {
    async fn lock_cart(&mut self, user_id: UserId) -> Result<Vec<LockedCartLine>, RepositoryError> {
        let data = &self.staged;
        let mut lines: Vec<LockedCartLine> = data
            .cart_lines
            .values()
            .filter(|l| l.user_id == user_id)
            .filter_map(|l| {
                data.products.get(&l.product_id).map(|p| LockedCartLine {
                    line_id: l.id,
                    product_id: p.id,
                    product_name: p.name.clone(),
                    unit_price: p.price,
                    quantity: l.quantity,
                    stock: p.stock,
                })
            })
            .collect();
        lines.sort_by_key(|l| l.product_id);
        Ok(lines)
    }

    async fn insert_order(
        &mut self,
        user_id: UserId,
        total: Money,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderId, RepositoryError> {
        let data = &mut self.staged;
        if !data.users.contains_key(&user_id) {
            return Err(RepositoryError::InvalidReference(format!(
                "user {user_id} does not exist"
            )));
        }
        let id = OrderId::new(next(&mut data.seq.order));
        data.orders.insert(
            id,
            Order {
                id,
                user_id,
                total,
                created_at: placed_at,
            },
        );
        Ok(id)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &LockedCartLine,
    ) -> Result<(), RepositoryError> {
        let data = &mut self.staged;
        if !data.orders.contains_key(&order_id) {
            return Err(RepositoryError::InvalidReference(format!(
                "order {order_id} does not exist"
            )));
        }
        let id = OrderLineId::new(next(&mut data.seq.order_line));
        data.order_lines.insert(
            id,
            OrderLine {
                id,
                order_id,
                product_id: Some(line.product_id),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
            },
        );
        Ok(())
    }

    async fn decrement_stock(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), RepositoryError> {
        let product = self.staged.products.get_mut(&product_id).ok_or_else(|| {
            RepositoryError::InvalidReference(format!("product {product_id} does not exist"))
        })?;
        if product.stock < quantity.get() {
            return Err(RepositoryError::Conflict(format!(
                "stock of product {product_id} is below {quantity}"
            )));
        }
        product.stock -= quantity.get();
        Ok(())
    }

    async fn delete_cart_line(
        &mut self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError> {
        if self.staged.owned_line_mut(user_id, line_id).is_some() {
            self.staged.cart_lines.remove(&line_id);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepositoryError> {
        Ok(())
    }
}
