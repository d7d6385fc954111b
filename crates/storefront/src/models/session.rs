//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use supermarket_core::{AdminCapability, Email, UserId, UserRole};

use super::user::User;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address.
    pub email: Email,
    /// Role at login time.
    pub role: UserRole,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl AdminCapability for CurrentUser {
    fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_session_roundtrip_keeps_role() {
        let user = CurrentUser {
            id: UserId::new(5),
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            role: UserRole::Admin,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["role"], "admin");

        let back: CurrentUser = serde_json::from_value(json).unwrap();
        assert!(back.is_admin());
        assert_eq!(back, user);
    }
}
