//! Cart repository. Line inserts and quantity changes run under the cart
//! row lock in `TxCartRepository`; only removals go through the pool.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::entities::{cart, cart_item};
use super::loaders;
use crate::config::CART_STATUS_ACTIVE;
use crate::domain::Cart;
use crate::errors::{conflict_on_duplicate, AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// The user's active cart with items and their products
    async fn find_active(&self, user_id: Uuid) -> AppResult<Option<Cart>>;

    /// Insert an empty active cart.
    ///
    /// Fails with `Conflict` when the user already has one.
    async fn create_active(&self, user_id: Uuid) -> AppResult<Cart>;

    async fn delete_item(&self, item_id: Uuid) -> AppResult<()>;

    /// Remove every line, keeping the cart itself
    async fn clear(&self, cart_id: Uuid) -> AppResult<u64>;
}

pub struct CartStore {
    db: DatabaseConnection,
}

impl CartStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn touch(&self, cart_id: Uuid) -> AppResult<()> {
        cart::Entity::update_many()
            .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(cart::Column::Id.eq(cart_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for CartStore {
    async fn find_active(&self, user_id: Uuid) -> AppResult<Option<Cart>> {
        Ok(loaders::find_active_cart(&self.db, user_id).await?)
    }

    async fn create_active(&self, user_id: Uuid) -> AppResult<Cart> {
        let now = Utc::now();
        let model = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            status: Set(CART_STATUS_ACTIVE.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| conflict_on_duplicate(e, "Active cart already exists"))?;

        Ok(loaders::assemble_cart(&self.db, model).await?)
    }

    async fn delete_item(&self, item_id: Uuid) -> AppResult<()> {
        let result = cart_item::Entity::delete_by_id(item_id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Cart item"));
        }
        Ok(())
    }

    async fn clear(&self, cart_id: Uuid) -> AppResult<u64> {
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(&self.db)
            .await?;

        self.touch(cart_id).await?;
        Ok(result.rows_affected)
    }
}
