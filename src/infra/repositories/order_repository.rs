//! Order reads and the admin status overwrite. Orders are created only by
//! checkout, inside its transaction.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::order;
use super::loaders;
use crate::domain::{Order, OrderStatus};
use crate::errors::{AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Every order, newest first
    async fn find_all(&self) -> AppResult<Vec<Order>>;

    /// Orders placed by one user, newest first
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Order>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>>;

    /// Overwrite the status, whatever it was
    async fn update_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Order>;
}

pub struct OrderStore {
    db: DatabaseConnection,
}

impl OrderStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OrderRepository for OrderStore {
    async fn find_all(&self) -> AppResult<Vec<Order>> {
        let models = order::Entity::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(loaders::with_items(&self.db, models).await?)
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Order>> {
        let models = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(loaders::with_items(&self.db, models).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        match order::Entity::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(loaders::with_items(&self.db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> AppResult<Order> {
        let model = order::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Order")?;

        let mut active: order::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        let model = active.update(&self.db).await?;

        loaders::with_items(&self.db, vec![model])
            .await?
            .pop()
            .ok_or_not_found("Order")
    }
}
