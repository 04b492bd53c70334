//! Shopping cart entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::Product;
use crate::config::{CART_STATUS_ACTIVE, CART_STATUS_INACTIVE};
use crate::errors::{AppError, AppResult};

/// A cart moves from active to inactive exactly once, at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Active,
    Inactive,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => CART_STATUS_ACTIVE,
            CartStatus::Inactive => CART_STATUS_INACTIVE,
        }
    }
}

impl From<&str> for CartStatus {
    fn from(s: &str) -> Self {
        match s {
            CART_STATUS_ACTIVE => CartStatus::Active,
            CART_STATUS_INACTIVE => CartStatus::Inactive,
            other => {
                tracing::warn!(status = other, "Unknown cart status, reading as inactive");
                CartStatus::Inactive
            }
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: CartStatus,
    /// Items in insertion order
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_for_product(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Sum of snapshot prices times quantities, saturating at `i64::MAX`.
    /// Checkout computes the binding total with checked arithmetic.
    pub fn subtotal_cents(&self) -> i64 {
        self.items
            .iter()
            .map(CartItem::line_total_cents)
            .fold(0, i64::saturating_add)
    }
}

/// Cart line. `price_cents` is the product price captured when the line was
/// last added to or updated, not the live price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_cents: i64,
    pub product: Option<Product>,
}

impl CartItem {
    pub fn line_total_cents(&self) -> i64 {
        self.price_cents.saturating_mul(i64::from(self.quantity))
    }
}

/// Cart quantities must be positive.
pub fn ensure_positive_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::validation("Quantity must be a positive integer"));
    }
    Ok(())
}
