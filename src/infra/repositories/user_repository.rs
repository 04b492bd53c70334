//! User repository for reads and admin edits outside a transaction.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::domain::{normalize_email, User, UserRole};
use crate::errors::{AppError, AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// List all users, oldest first
    async fn list(&self) -> AppResult<Vec<User>>;

    /// Update profile fields; `None` leaves a field untouched
    async fn update(
        &self,
        id: Uuid,
        full_name: Option<String>,
        role: Option<UserRole>,
        password_hash: Option<String>,
    ) -> AppResult<User>;

    /// Delete a user and everything they own
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        use sea_orm::{ColumnTrait, QueryFilter};

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(&self.db)
            .await?;
        Ok(result.map(User::from))
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .order_by_asc(user::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(User::from).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        full_name: Option<String>,
        role: Option<UserRole>,
        password_hash: Option<String>,
    ) -> AppResult<User> {
        let model = UserEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_not_found("User")?;

        let mut active: ActiveModel = model.into();
        if let Some(full_name) = full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(role) = role {
            active.role = Set(role.to_string());
        }
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash);
        }
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await?;
        Ok(User::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = UserEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("User"));
        }
        Ok(())
    }
}
