//! Service Container - Centralized service access.
//!
//! SOLID (SRP): Manages service lifecycle and access.
//! SOLID (DIP): Depends on service traits, not implementations.
//!
//! All services share one `Persistence` unit of work, so they see the same
//! connection pool.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::{
    AuthService, Authenticator, CartManager, CartService, CatalogManager, CatalogService,
    OrderManager, OrderService, UserManager, UserService,
};
use crate::config::{AuthConfig, Config};
use crate::domain::{Argon2Hasher, SecretHasher};
use crate::infra::{DiskImageStore, ImageStore, Persistence};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Service container trait for dependency injection.
///
/// Provides centralized access to all application services.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait ServiceContainer: Send + Sync {
    fn auth(&self) -> Arc<dyn AuthService>;

    fn users(&self) -> Arc<dyn UserService>;

    fn catalog(&self) -> Arc<dyn CatalogService>;

    fn carts(&self) -> Arc<dyn CartService>;

    fn orders(&self) -> Arc<dyn OrderService>;
}

/// Concrete implementation of ServiceContainer
#[derive(Clone)]
pub struct Services {
    auth_service: Arc<dyn AuthService>,
    user_service: Arc<dyn UserService>,
    catalog_service: Arc<dyn CatalogService>,
    cart_service: Arc<dyn CartService>,
    order_service: Arc<dyn OrderService>,
}

impl Services {
    pub fn new(
        auth_service: Arc<dyn AuthService>,
        user_service: Arc<dyn UserService>,
        catalog_service: Arc<dyn CatalogService>,
        cart_service: Arc<dyn CartService>,
        order_service: Arc<dyn OrderService>,
    ) -> Self {
        Self {
            auth_service,
            user_service,
            catalog_service,
            cart_service,
            order_service,
        }
    }

    /// Wire every service over one connection with Argon2 hashing
    pub fn from_connection(
        db: DatabaseConnection,
        auth_config: AuthConfig,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        let uow = Arc::new(Persistence::new(db));
        let hasher: Arc<dyn SecretHasher> = Arc::new(Argon2Hasher);

        Self {
            auth_service: Arc::new(Authenticator::new(uow.clone(), hasher.clone(), auth_config)),
            user_service: Arc::new(UserManager::new(uow.clone(), hasher)),
            catalog_service: Arc::new(CatalogManager::new(uow.clone(), images)),
            cart_service: Arc::new(CartManager::new(uow.clone())),
            order_service: Arc::new(OrderManager::new(uow)),
        }
    }

    /// Wire every service from loaded configuration
    pub fn from_config(db: DatabaseConnection, config: &Config) -> Self {
        let images = Arc::new(DiskImageStore::new(config.image_dir.clone()));
        Self::from_connection(db, config.auth.clone(), images)
    }
}

impl ServiceContainer for Services {
    fn auth(&self) -> Arc<dyn AuthService> {
        self.auth_service.clone()
    }

    fn users(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    fn catalog(&self) -> Arc<dyn CatalogService> {
        self.catalog_service.clone()
    }

    fn carts(&self) -> Arc<dyn CartService> {
        self.cart_service.clone()
    }

    fn orders(&self) -> Arc<dyn OrderService> {
        self.order_service.clone()
    }
}
