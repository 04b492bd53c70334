//! Order service - Checkout and order administration.
//!
//! Checkout drains the active cart into a pending order in one transaction:
//! every product row is locked, checked and decremented, the order and its
//! snapshot lines are written and the cart is retired. Any failure rolls
//! the whole unit back, so stock is never partially deducted.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::cart_service::ensure_active_cart;
use crate::domain::{CheckoutRequest, CurrentUser, NewOrder, NewOrderItem, Order, OrderStatus};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::with_transaction;

/// Order service trait for dependency injection.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Turn the user's active cart into a pending order
    async fn checkout(&self, user_id: Uuid, request: CheckoutRequest) -> AppResult<Order>;

    /// Overwrite an order's status (admin only)
    async fn update_status(
        &self,
        actor: &CurrentUser,
        order_id: Uuid,
        status: OrderStatus,
    ) -> AppResult<Order>;

    /// Every order, newest first (admin only)
    async fn find_all(&self, actor: &CurrentUser) -> AppResult<Vec<Order>>;

    /// The user's own orders, newest first
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Order>>;

    /// One order; customers only see their own
    async fn find_one(&self, actor: &CurrentUser, order_id: Uuid) -> AppResult<Order>;
}

/// Concrete implementation of OrderService using Unit of Work.
pub struct OrderManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> OrderManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> OrderService for OrderManager<U> {
    #[tracing::instrument(skip(self, request))]
    async fn checkout(&self, user_id: Uuid, request: CheckoutRequest) -> AppResult<Order> {
        request.validate()?;
        let CheckoutRequest {
            payment_method,
            shipping_address,
        } = request;

        let order = with_transaction!(self.uow, |ctx| {
            let cart = ctx
                .carts()
                .find_active_for_update(user_id)
                .await?
                .filter(|cart| !cart.is_empty())
                .ok_or(AppError::EmptyCart)?;

            // Product locks are taken in cart-line order
            let mut items = Vec::with_capacity(cart.items.len());
            for line in &cart.items {
                let product = ctx
                    .products()
                    .find_for_update(line.product_id)
                    .await?
                    .ok_or_not_found("Product")?;

                if !product.has_stock_for(line.quantity) {
                    tracing::warn!(
                        product_id = %product.id,
                        requested = line.quantity,
                        stock = product.stock_qty,
                        "Checkout rejected for insufficient stock"
                    );
                    return Err(AppError::out_of_stock(product.name));
                }

                ctx.products()
                    .decrement_stock(product.id, line.quantity)
                    .await?;

                // Priced at the cart snapshot, not the current product price
                items.push(NewOrderItem {
                    product_id: product.id,
                    name_snapshot: product.name,
                    price_cents: line.price_cents,
                    quantity: line.quantity,
                });
            }

            let order = ctx
                .orders()
                .create(NewOrder {
                    user_id,
                    payment_reference: payment_method,
                    shipping_address,
                    items,
                })
                .await?;

            ctx.carts().deactivate(cart.id).await?;
            tracing::debug!(cart_id = %cart.id, "Cart deactivated");

            Ok(order)
        })?;

        tracing::info!(
            order_id = %order.id,
            total_cents = order.total_cents,
            lines = order.items.len(),
            "Order placed"
        );

        // Not part of the checkout unit; the order stands even if this fails
        if let Err(e) = ensure_active_cart(self.uow.carts().as_ref(), user_id).await {
            tracing::error!("Failed to open a fresh cart after checkout: {}", e);
        }

        Ok(order)
    }

    #[tracing::instrument(skip(self, actor), fields(actor_id = %actor.id))]
    async fn update_status(
        &self,
        actor: &CurrentUser,
        order_id: Uuid,
        status: OrderStatus,
    ) -> AppResult<Order> {
        actor.require_admin()?;

        let order = self.uow.orders().update_status(order_id, status).await?;
        tracing::info!(%order_id, status = %order.status, "Order status updated");
        Ok(order)
    }

    async fn find_all(&self, actor: &CurrentUser) -> AppResult<Vec<Order>> {
        actor.require_admin()?;
        self.uow.orders().find_all().await
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Order>> {
        self.uow.orders().find_by_user(user_id).await
    }

    #[tracing::instrument(skip(self, actor), fields(actor_id = %actor.id))]
    async fn find_one(&self, actor: &CurrentUser, order_id: Uuid) -> AppResult<Order> {
        self.uow
            .orders()
            .find_by_id(order_id)
            .await?
            // Someone else's order is reported as missing
            .filter(|order| actor.is_admin() || order.is_owned_by(actor.id))
            .ok_or_not_found("Order")
    }
}
