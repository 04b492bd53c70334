//! Cart service - Active-cart lifecycle and line items.
//!
//! SOLID (SRP): Owns the one-active-cart-per-user rule and the price
//! snapshot taken whenever a line is written.
//! DDD: Uses Unit of Work for repository access. Line writes lock the
//! active cart row, the same lock checkout takes before retiring it.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::CART_WRITE_ATTEMPTS;
use crate::domain::{ensure_positive_quantity, Cart, Product};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{CartRepository, UnitOfWork};
use crate::with_transaction;

/// Cart service trait for dependency injection.
#[async_trait]
pub trait CartService: Send + Sync {
    /// The user's active cart, created empty on first access
    async fn get_active_cart(&self, user_id: Uuid) -> AppResult<Cart>;

    /// Add units of a published product, merging with an existing line
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> AppResult<Cart>;

    /// Set the quantity of a line in the active cart
    async fn update_item(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> AppResult<Cart>;

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<Cart>;

    /// Remove every line; the cart itself stays
    async fn clear_cart(&self, user_id: Uuid) -> AppResult<Cart>;
}

/// Look up the active cart or create it.
///
/// Two callers may both miss the lookup; the loser of the insert race hits
/// the one-active-cart unique index and reads the winner's cart instead.
pub(crate) async fn ensure_active_cart(
    carts: &dyn CartRepository,
    user_id: Uuid,
) -> AppResult<Cart> {
    if let Some(cart) = carts.find_active(user_id).await? {
        return Ok(cart);
    }

    match carts.create_active(user_id).await {
        Ok(cart) => {
            tracing::info!(%user_id, cart_id = %cart.id, "Active cart created");
            Ok(cart)
        }
        Err(AppError::Conflict(_)) => {
            tracing::debug!(%user_id, "Lost active cart creation race, re-reading");
            carts.find_active(user_id).await?.ok_or_not_found("Cart")
        }
        Err(e) => Err(e),
    }
}

/// How adding units of a product changes a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineWrite {
    /// Merge into an existing line, which ends up at `quantity`
    Update { item_id: Uuid, quantity: i32 },
    Insert { quantity: i32 },
}

/// Plan adding `quantity` units of `product` to `cart`.
///
/// The merged quantity is what gets checked against stock.
fn plan_line(cart: &Cart, product: &Product, quantity: i32) -> AppResult<LineWrite> {
    let existing = cart.item_for_product(product.id);
    let desired = existing
        .map_or(0, |item| item.quantity)
        .checked_add(quantity)
        .ok_or_else(|| AppError::validation("Quantity is too large"))?;

    if !product.has_stock_for(desired) {
        tracing::warn!(product_id = %product.id, desired, stock = product.stock_qty, "Insufficient stock for cart");
        return Err(AppError::InsufficientStock(None));
    }

    Ok(match existing {
        Some(item) => LineWrite::Update {
            item_id: item.id,
            quantity: desired,
        },
        None => LineWrite::Insert { quantity },
    })
}

/// Concrete implementation of CartService using Unit of Work.
pub struct CartManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> CartManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    /// Draft and archived products are reported as missing
    async fn purchasable_product(&self, product_id: Uuid) -> AppResult<Product> {
        self.uow
            .products()
            .find_by_id(product_id)
            .await?
            .filter(Product::is_purchasable)
            .ok_or_not_found("Product")
    }

    /// Write the line into the locked active cart, re-pricing at the
    /// product's current price.
    ///
    /// Returns `false` without writing when the user has no active cart,
    /// i.e. a checkout retired it after the caller read it.
    async fn write_line(&self, user_id: Uuid, product: Product, quantity: i32) -> AppResult<bool> {
        with_transaction!(self.uow, |ctx| {
            let carts = ctx.carts();
            let Some(cart) = carts.find_active_for_update(user_id).await? else {
                return Ok(false);
            };

            match plan_line(&cart, &product, quantity)? {
                LineWrite::Update { item_id, quantity } => {
                    carts
                        .update_item(cart.id, item_id, quantity, product.price_cents)
                        .await?
                }
                LineWrite::Insert { quantity } => {
                    carts
                        .insert_item(cart.id, product.id, quantity, product.price_cents)
                        .await?
                }
            }
            Ok(true)
        })
    }
}

#[async_trait]
impl<U: UnitOfWork> CartService for CartManager<U> {
    #[tracing::instrument(skip(self))]
    async fn get_active_cart(&self, user_id: Uuid) -> AppResult<Cart> {
        ensure_active_cart(self.uow.carts().as_ref(), user_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> AppResult<Cart> {
        ensure_positive_quantity(quantity)?;
        let product = self.purchasable_product(product_id).await?;

        for attempt in 1..=CART_WRITE_ATTEMPTS {
            // Also creates the cart; the locked read inside re-plans the line
            let cart = self.get_active_cart(user_id).await?;
            plan_line(&cart, &product, quantity)?;

            if self.write_line(user_id, product.clone(), quantity).await? {
                tracing::debug!(%product_id, quantity, "Cart line written");
                return self.get_active_cart(user_id).await;
            }
            tracing::debug!(%user_id, attempt, "Active cart retired before the line was written");
        }

        Err(AppError::conflict("Cart was checked out concurrently, try again"))
    }

    #[tracing::instrument(skip(self))]
    async fn update_item(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> AppResult<Cart> {
        ensure_positive_quantity(quantity)?;

        let cart = self.get_active_cart(user_id).await?;
        // Lines of other carts are reported as missing too
        let item = cart.item(item_id).ok_or_not_found("Cart item")?;
        let product = self.purchasable_product(item.product_id).await?;

        if !product.has_stock_for(quantity) {
            tracing::warn!(product_id = %product.id, quantity, stock = product.stock_qty, "Insufficient stock for cart");
            return Err(AppError::InsufficientStock(None));
        }

        let price_cents = product.price_cents;
        with_transaction!(self.uow, |ctx| {
            let carts = ctx.carts();
            // A checkout in between retired the cart along with the line
            let cart = carts
                .find_active_for_update(user_id)
                .await?
                .ok_or_not_found("Cart item")?;
            carts
                .update_item(cart.id, item_id, quantity, price_cents)
                .await
        })?;
        self.get_active_cart(user_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<Cart> {
        let cart = self.get_active_cart(user_id).await?;
        let item = cart.item(item_id).ok_or_not_found("Cart item")?;

        self.uow.carts().delete_item(item.id).await?;
        self.get_active_cart(user_id).await
    }

    #[tracing::instrument(skip(self))]
    async fn clear_cart(&self, user_id: Uuid) -> AppResult<Cart> {
        let cart = self.get_active_cart(user_id).await?;

        let removed = self.uow.carts().clear(cart.id).await?;
        tracing::debug!(cart_id = %cart.id, removed, "Cart cleared");
        self.get_active_cart(user_id).await
    }
}
