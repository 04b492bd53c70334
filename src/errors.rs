//! Centralized error handling.
//!
//! Provides a unified error type for the entire storefront core. The HTTP
//! boundary lives outside this crate; `status_code`, `code` and
//! `user_message` describe how each failure should be surfaced there.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("{0}")]
    Unauthorized(String),

    #[error("Access denied")]
    Forbidden,

    // Resource errors
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    // Business rules
    #[error("{}", insufficient_stock_message(.0))]
    InsufficientStock(Option<String>),

    #[error("Cart is empty")]
    EmptyCart,

    // Validation
    #[error("{0}")]
    Validation(String),

    // External service errors
    #[error("Database error")]
    Database(#[from] DbErr),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

fn insufficient_stock_message(product: &Option<String>) -> String {
    match product {
        Some(name) => format!("{} is out of stock", name),
        None => "Insufficient stock".to_string(),
    }
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::EmptyCart => "EMPTY_CART",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the boundary should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Unauthorized(_) | AppError::Jwt(_) => 401,
            AppError::Forbidden => 403,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::InsufficientStock(_) | AppError::EmptyCart | AppError::Validation(_) => 400,
            AppError::Database(_) | AppError::Internal(_) => 500,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "Invalid or expired token".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// True when the store rejected a write on a unique constraint
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            AppError::Database(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        )
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T> {
        self.ok_or(AppError::NotFound(entity))
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn out_of_stock(product: impl Into<String>) -> Self {
        AppError::InsufficientStock(Some(product.into()))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(format_validation_errors(&errors))
    }
}

/// Format validation errors into a user-friendly string
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

/// Map a unique-constraint failure onto a conflict, leaving other errors alone.
pub(crate) fn conflict_on_duplicate(err: DbErr, msg: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict(msg),
        _ => AppError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_messages() {
        assert_eq!(
            AppError::out_of_stock("Safari Kit").to_string(),
            "Safari Kit is out of stock"
        );
        assert_eq!(AppError::InsufficientStock(None).to_string(), "Insufficient stock");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("Product").status_code(), 404);
        assert_eq!(AppError::unauthorized("nope").status_code(), 401);
        assert_eq!(AppError::EmptyCart.status_code(), 400);
        assert_eq!(AppError::conflict("Email already registered").status_code(), 409);
        assert_eq!(AppError::Forbidden.status_code(), 403);
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::internal("connection pool exhausted");
        assert_eq!(err.user_message(), "An internal error occurred");
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let missing: Option<u8> = None;
        let err = missing.ok_or_not_found("Cart item").unwrap_err();
        assert_eq!(err.to_string(), "Cart item not found");
    }
}
