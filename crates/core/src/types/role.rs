//! User roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid user role: {0}")]
pub struct UserRoleParseError(pub String);

/// Role of a storefront account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Can browse, fill a cart and place orders.
    #[default]
    Customer,
    /// Can additionally manage the product catalog.
    Admin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = UserRoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            _ => Err(UserRoleParseError(s.to_owned())),
        }
    }
}

/// Anything that can answer whether it holds catalog-management rights.
///
/// Implemented by the role itself and by session identities, so admin
/// checks never compare email strings.
pub trait AdminCapability {
    /// Whether the holder may manage the catalog.
    fn is_admin(&self) -> bool;
}

impl AdminCapability for UserRole {
    fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}
