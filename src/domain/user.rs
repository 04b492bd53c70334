//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::{MIN_PASSWORD_LENGTH, ROLE_ADMIN, ROLE_CUSTOMER};
use crate::errors::{AppError, AppResult};

/// User roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Customer,
}

impl UserRole {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => UserRole::Admin,
            _ => UserRole::Customer,
        }
    }
}

impl From<UserRole> for String {
    fn from(role: UserRole) -> Self {
        role.to_string()
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Admin => write!(f, "{}", ROLE_ADMIN),
            UserRole::Customer => write!(f, "{}", ROLE_CUSTOMER),
        }
    }
}

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// User view without credentials (safe to return to client)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafeUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for SafeUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Lower-case and trim an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 12, message = "Password must be at least 12 characters"))]
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
}

/// Admin-side user edit; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub password: Option<String>,
}

/// Identity of the caller, taken from a verified access token.
///
/// Roles are checked explicitly with `require_admin` instead of being
/// encoded in separate user types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn new(id: Uuid, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            id,
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fail with `Forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.email.clone(), user.role)
    }
}

/// Reject passwords below the stored-password minimum.
pub(crate) fn check_password_length(plain_text: &str) -> AppResult<()> {
    if plain_text.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_strings() {
        assert_eq!(UserRole::from("admin"), UserRole::Admin);
        assert_eq!(UserRole::from("customer"), UserRole::Customer);
        assert_eq!(UserRole::from("something-else"), UserRole::Customer);
        assert_eq!(String::from(UserRole::Admin), "admin");
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn test_require_admin() {
        let admin = CurrentUser::new(Uuid::new_v4(), "a@x.io", UserRole::Admin);
        let customer = CurrentUser::new(Uuid::new_v4(), "c@x.io", UserRole::Customer);

        assert!(admin.require_admin().is_ok());
        assert!(matches!(customer.require_admin(), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_register_password_minimum() {
        let input = RegisterUser {
            email: "new@example.com".into(),
            password: "elevenchars".into(),
            full_name: None,
            role: None,
        };
        assert!(input.validate().is_err());

        let input = RegisterUser {
            password: "twelve-chars".into(),
            ..input
        };
        assert!(input.validate().is_ok());
    }
}
