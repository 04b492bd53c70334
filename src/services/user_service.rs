//! User service - Account lookup and administration.
//!
//! SOLID (SRP): Handles user-related use cases only.
//! DDD: Orchestrates domain operations via Unit of Work.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{CurrentUser, Password, SafeUser, SecretHasher, UserChanges};
use crate::errors::{AppResult, OptionExt};
use crate::infra::UnitOfWork;

/// User service trait for dependency injection.
///
/// Everything except `get_user` is restricted to administrators.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_user(&self, id: Uuid) -> AppResult<SafeUser>;

    /// All users, oldest first
    async fn list_users(&self, actor: &CurrentUser) -> AppResult<Vec<SafeUser>>;

    /// Change name, role or password; omitted fields stay as they are
    async fn update_user(
        &self,
        actor: &CurrentUser,
        id: Uuid,
        changes: UserChanges,
    ) -> AppResult<SafeUser>;

    /// Remove a user together with their carts, orders and sessions
    async fn delete_user(&self, actor: &CurrentUser, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
    hasher: Arc<dyn SecretHasher>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { uow, hasher }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn get_user(&self, id: Uuid) -> AppResult<SafeUser> {
        self.uow
            .users()
            .find_by_id(id)
            .await?
            .map(SafeUser::from)
            .ok_or_not_found("User")
    }

    async fn list_users(&self, actor: &CurrentUser) -> AppResult<Vec<SafeUser>> {
        actor.require_admin()?;

        let users = self.uow.users().list().await?;
        Ok(users.into_iter().map(SafeUser::from).collect())
    }

    #[tracing::instrument(skip(self, actor, changes), fields(actor_id = %actor.id))]
    async fn update_user(
        &self,
        actor: &CurrentUser,
        id: Uuid,
        changes: UserChanges,
    ) -> AppResult<SafeUser> {
        actor.require_admin()?;

        let password_hash = match changes.password.as_deref() {
            Some(plain) => Some(Password::new(plain, self.hasher.as_ref())?.into_string()),
            None => None,
        };

        let user = self
            .uow
            .users()
            .update(id, changes.full_name, changes.role, password_hash)
            .await?;

        tracing::info!(user_id = %id, "User updated");
        Ok(SafeUser::from(user))
    }

    #[tracing::instrument(skip(self, actor), fields(actor_id = %actor.id))]
    async fn delete_user(&self, actor: &CurrentUser, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;

        self.uow.users().delete(id).await?;
        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}
