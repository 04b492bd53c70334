//! Transaction-bound repositories.
//!
//! Each borrows the open transaction, so every call made through a
//! `TransactionContext` commits or rolls back together.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use super::entities::{
    cart, cart_item, category, order, order_item, product, product_category, product_image,
    refresh_token, user,
};
use super::loaders;
use crate::config::{CART_STATUS_ACTIVE, CART_STATUS_INACTIVE, ORDER_STATUS_PENDING};
use crate::domain::{
    normalize_email, Cart, NewOrder, NewProduct, Order, OrderItem, Product, ProductChanges,
    ProductDetails, ProductImageInput, RefreshToken, User, UserRole,
};
use crate::errors::{conflict_on_duplicate, AppError, AppResult, OptionExt};

/// Users inside a transaction
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = user::Entity::find_by_id(id).one(self.txn).await?;
        Ok(result.map(User::from))
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.txn)
            .await?;
        Ok(result.map(User::from))
    }

    /// Create a user; `Conflict` if the normalized email is taken
    pub async fn create(
        &self,
        email: &str,
        password_hash: String,
        full_name: Option<String>,
        role: UserRole,
    ) -> AppResult<User> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(normalize_email(email)),
            password_hash: Set(password_hash),
            full_name: Set(full_name),
            role: Set(role.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Email already registered"))?;

        Ok(User::from(model))
    }
}

/// Refresh tokens inside a transaction
pub struct TxTokenRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxTokenRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Every unrevoked, unexpired token of every user
    pub async fn find_active(&self, now: DateTime<Utc>) -> AppResult<Vec<RefreshToken>> {
        let models = refresh_token::Entity::find()
            .filter(refresh_token::Column::RevokedAt.is_null())
            .filter(refresh_token::Column::ExpiresAt.gt(now))
            .all(self.txn)
            .await?;
        Ok(models.into_iter().map(RefreshToken::from).collect())
    }

    /// Revoke one token if it is still unrevoked.
    ///
    /// Returns `false` when another caller revoked it first.
    pub async fn revoke(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(now))
            .filter(refresh_token::Column::Id.eq(id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.txn)
            .await?;
        Ok(result.rows_affected == 1)
    }

    /// Revoke every unrevoked token of a user; returns how many were revoked
    pub async fn revoke_all_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::RevokedAt, Expr::value(now))
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.txn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> AppResult<RefreshToken> {
        let model = refresh_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(token_hash),
            expires_at: Set(expires_at),
            revoked_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.txn)
        .await?;
        Ok(RefreshToken::from(model))
    }
}

/// Products inside a transaction. Rows fetched for writing are locked.
pub struct TxProductRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxProductRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Read a product and hold an exclusive lock on its row until the
    /// transaction ends. Images are not loaded.
    pub async fn find_for_update(&self, id: Uuid) -> AppResult<Option<Product>> {
        let select = product::Entity::find_by_id(id);
        let model = loaders::for_update(select, self.txn.get_database_backend())
            .one(self.txn)
            .await?;
        Ok(model.map(Product::from))
    }

    /// Subtract from stock. The caller must hold the row lock and have checked
    /// availability; the `stock_qty >= 0` check constraint backs this up.
    pub async fn decrement_stock(&self, id: Uuid, quantity: i32) -> AppResult<()> {
        let result = product::Entity::update_many()
            .col_expr(
                product::Column::StockQty,
                Expr::col(product::Column::StockQty).sub(quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(id))
            .exec(self.txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Product"));
        }
        Ok(())
    }

    /// Whether another product already uses `slug`
    pub async fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> AppResult<bool> {
        let mut select = product::Entity::find().filter(product::Column::Slug.eq(slug));
        if let Some(id) = except {
            select = select.filter(product::Column::Id.ne(id));
        }
        Ok(select.one(self.txn).await?.is_some())
    }

    /// Insert the product row. `input.slug` must already be normalized.
    pub async fn create(&self, input: &NewProduct) -> AppResult<Product> {
        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.clone()),
            slug: Set(input.slug.clone()),
            description: Set(input.description.clone()),
            price_cents: Set(input.price_cents),
            stock_qty: Set(input.stock_qty),
            status: Set(input.status.unwrap_or_default().as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Product slug already in use"))?;

        Ok(Product::from(model))
    }

    /// Apply the scalar fields of `changes` to a locked product row.
    /// `changes.slug`, when present, must already be normalized.
    pub async fn update(&self, id: Uuid, changes: &ProductChanges) -> AppResult<Product> {
        let select = product::Entity::find_by_id(id);
        let model = loaders::for_update(select, self.txn.get_database_backend())
            .one(self.txn)
            .await?
            .ok_or_not_found("Product")?;

        let mut active: product::ActiveModel = model.into();
        if let Some(name) = &changes.name {
            active.name = Set(name.clone());
        }
        if let Some(slug) = &changes.slug {
            active.slug = Set(slug.clone());
        }
        if let Some(description) = &changes.description {
            active.description = Set(Some(description.clone()));
        }
        if let Some(price_cents) = changes.price_cents {
            active.price_cents = Set(price_cents);
        }
        if let Some(stock_qty) = changes.stock_qty {
            active.stock_qty = Set(stock_qty);
        }
        if let Some(status) = changes.status {
            active.status = Set(status.as_str().to_string());
        }
        active.updated_at = Set(Utc::now());

        let model = active
            .update(self.txn)
            .await
            .map_err(|e| conflict_on_duplicate(e, "Product slug already in use"))?;
        Ok(Product::from(model))
    }

    /// Replace the product's categories; `NotFound` if any id is unknown
    pub async fn set_categories(&self, product_id: Uuid, category_ids: &[Uuid]) -> AppResult<()> {
        let wanted: BTreeSet<Uuid> = category_ids.iter().copied().collect();
        if !wanted.is_empty() {
            let found = category::Entity::find()
                .filter(category::Column::Id.is_in(wanted.iter().copied()))
                .all(self.txn)
                .await?;
            if found.len() != wanted.len() {
                return Err(AppError::NotFound("Category"));
            }
        }

        product_category::Entity::delete_many()
            .filter(product_category::Column::ProductId.eq(product_id))
            .exec(self.txn)
            .await?;

        if wanted.is_empty() {
            return Ok(());
        }

        let links = wanted.into_iter().map(|category_id| product_category::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(category_id),
        });
        product_category::Entity::insert_many(links)
            .exec(self.txn)
            .await?;
        Ok(())
    }

    /// Replace the product's images with `images`; sort order defaults to 0
    pub async fn replace_images(&self, product_id: Uuid, images: &[ProductImageInput]) -> AppResult<()> {
        product_image::Entity::delete_many()
            .filter(product_image::Column::ProductId.eq(product_id))
            .exec(self.txn)
            .await?;

        if images.is_empty() {
            return Ok(());
        }

        let rows = images.iter().map(|image| product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            image_url: Set(image.image_url.clone()),
            sort_order: Set(image.sort_order.unwrap_or(0)),
        });
        product_image::Entity::insert_many(rows).exec(self.txn).await?;
        Ok(())
    }

    pub async fn find_details(&self, id: Uuid) -> AppResult<Option<ProductDetails>> {
        Ok(loaders::find_product_details(self.txn, id).await?)
    }
}

/// Carts inside a transaction
pub struct TxCartRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxCartRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Lock and load the user's active cart.
    ///
    /// A second checkout of the same cart waits here, then finds no active
    /// cart once the first one commits.
    pub async fn find_active_for_update(&self, user_id: Uuid) -> AppResult<Option<Cart>> {
        let select = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .filter(cart::Column::Status.eq(CART_STATUS_ACTIVE));
        let model = loaders::for_update(select, self.txn.get_database_backend())
            .one(self.txn)
            .await?;

        match model {
            Some(model) => Ok(Some(loaders::assemble_cart(self.txn, model).await?)),
            None => Ok(None),
        }
    }

    /// Add a line to a cart locked by `find_active_for_update`.
    ///
    /// Fails with `Conflict` if the product is already in the cart.
    pub async fn insert_item(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        price_cents: i64,
    ) -> AppResult<()> {
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            price_cents: Set(price_cents),
            created_at: Set(Utc::now()),
        }
        .insert(self.txn)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Product already in cart"))?;

        self.touch(cart_id).await
    }

    /// Overwrite quantity and price snapshot of a line in a locked cart
    pub async fn update_item(
        &self,
        cart_id: Uuid,
        item_id: Uuid,
        quantity: i32,
        price_cents: i64,
    ) -> AppResult<()> {
        let result = cart_item::Entity::update_many()
            .col_expr(cart_item::Column::Quantity, Expr::value(quantity))
            .col_expr(cart_item::Column::PriceCents, Expr::value(price_cents))
            .filter(cart_item::Column::Id.eq(item_id))
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(self.txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Cart item"));
        }

        self.touch(cart_id).await
    }

    async fn touch(&self, cart_id: Uuid) -> AppResult<()> {
        cart::Entity::update_many()
            .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart::Column::Id.eq(cart_id))
            .exec(self.txn)
            .await?;
        Ok(())
    }

    /// Retire an active cart: drop its items and mark it inactive.
    pub async fn deactivate(&self, cart_id: Uuid) -> AppResult<()> {
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(self.txn)
            .await?;

        let result = cart::Entity::update_many()
            .col_expr(cart::Column::Status, Expr::value(CART_STATUS_INACTIVE))
            .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart::Column::Id.eq(cart_id))
            .filter(cart::Column::Status.eq(CART_STATUS_ACTIVE))
            .exec(self.txn)
            .await?;

        // Never reactivated and never retired twice
        if result.rows_affected == 0 {
            return Err(AppError::EmptyCart);
        }
        Ok(())
    }
}

/// Orders inside a transaction
pub struct TxOrderRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxOrderRepository<'a> {
    pub(crate) fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Write a pending order and its lines. The total is the sum of the
    /// lines' snapshot prices times quantities.
    pub async fn create(&self, new_order: NewOrder) -> AppResult<Order> {
        let total_cents = new_order.total_cents()?;
        let now = Utc::now();
        let model = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new_order.user_id),
            total_cents: Set(total_cents),
            status: Set(ORDER_STATUS_PENDING.to_string()),
            payment_reference: Set(Some(new_order.payment_reference)),
            shipping_address: Set(new_order.shipping_address),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.txn)
        .await?;

        let mut items = Vec::with_capacity(new_order.items.len());
        for (position, line) in new_order.items.into_iter().enumerate() {
            let row = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(model.id),
                product_id: Set(Some(line.product_id)),
                name_snapshot: Set(line.name_snapshot),
                price_cents: Set(line.price_cents),
                quantity: Set(line.quantity),
                position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            }
            .insert(self.txn)
            .await?;
            items.push(OrderItem::from(row));
        }

        Ok(model.into_order(items))
    }
}
