//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from database row types.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartLineView};
pub use order::{LockedCartLine, Order, OrderLine, OrderWithLines, PlacedOrder};
pub use product::{FieldError, Product, ProductDraft, ProductFilter, ProductInput, ValidationErrors};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
