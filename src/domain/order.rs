//! Orders and their immutable line items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::config::{
    ORDER_STATUS_CANCELLED, ORDER_STATUS_FULFILLED, ORDER_STATUS_PAID, ORDER_STATUS_PENDING,
};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => ORDER_STATUS_PENDING,
            OrderStatus::Paid => ORDER_STATUS_PAID,
            OrderStatus::Fulfilled => ORDER_STATUS_FULFILLED,
            OrderStatus::Cancelled => ORDER_STATUS_CANCELLED,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            ORDER_STATUS_PAID => OrderStatus::Paid,
            ORDER_STATUS_FULFILLED => OrderStatus::Fulfilled,
            ORDER_STATUS_CANCELLED => OrderStatus::Cancelled,
            ORDER_STATUS_PENDING => OrderStatus::Pending,
            other => {
                tracing::warn!(status = other, "Unknown order status, reading as pending");
                OrderStatus::Pending
            }
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_cents: i64,
    pub status: OrderStatus,
    /// Free-text payment reference; no gateway is involved
    pub payment_reference: Option<String>,
    pub shipping_address: Option<Value>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// Snapshot of a purchased line. `product_id` becomes `None` once the
/// product is deleted; the name and price stay as they were at checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name_snapshot: String,
    pub price_cents: i64,
    pub quantity: i32,
}

/// Checkout input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    pub shipping_address: Option<Value>,
}

/// Order line about to be written at checkout
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub name_snapshot: String,
    pub price_cents: i64,
    pub quantity: i32,
}

/// Order about to be written at checkout
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub payment_reference: String,
    pub shipping_address: Option<Value>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Sum of price times quantity over every line.
    ///
    /// # Errors
    /// Returns a validation error when the total does not fit in an `i64`.
    pub fn total_cents(&self) -> AppResult<i64> {
        self.items
            .iter()
            .try_fold(0i64, |total, item| {
                item.price_cents
                    .checked_mul(i64::from(item.quantity))
                    .and_then(|line| total.checked_add(line))
            })
            .ok_or_else(|| AppError::validation("Order total is too large"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Fulfilled,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from(status.as_str()), status);
        }
    }

    #[test]
    fn test_new_order_total() {
        let order = NewOrder {
            user_id: Uuid::new_v4(),
            payment_reference: "card".into(),
            shipping_address: None,
            items: vec![
                NewOrderItem {
                    product_id: Uuid::new_v4(),
                    name_snapshot: "Mug".into(),
                    price_cents: 1000,
                    quantity: 2,
                },
                NewOrderItem {
                    product_id: Uuid::new_v4(),
                    name_snapshot: "Poster".into(),
                    price_cents: 2500,
                    quantity: 1,
                },
            ],
        };
        assert_eq!(order.total_cents().unwrap(), 4500);
    }

    #[test]
    fn test_new_order_total_overflow_is_an_error() {
        let line = |price_cents: i64, quantity: i32| NewOrderItem {
            product_id: Uuid::new_v4(),
            name_snapshot: "Yacht".into(),
            price_cents,
            quantity,
        };
        let mut order = NewOrder {
            user_id: Uuid::new_v4(),
            payment_reference: "card".into(),
            shipping_address: None,
            items: vec![line(i64::MAX / 2 + 1, 2)],
        };
        assert!(matches!(order.total_cents(), Err(AppError::Validation(_))));

        // Each line fits, the sum does not
        order.items = vec![line(i64::MAX - 1, 1), line(2, 1)];
        assert!(matches!(order.total_cents(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unknown_status_reads_as_pending() {
        assert_eq!(OrderStatus::from("shipped"), OrderStatus::Pending);
    }

    #[test]
    fn test_checkout_requires_payment_method() {
        let request = CheckoutRequest {
            payment_method: String::new(),
            shipping_address: None,
        };
        assert!(request.validate().is_err());
    }
}
