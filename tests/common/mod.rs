//! Shared fixtures for integration tests.
//!
//! Every test gets its own SQLite file migrated with the production
//! migrations. The pool holds a single connection, so concurrent callers
//! queue for it the way concurrent transactions queue for row locks.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;
use uuid::Uuid;

use storefront::config::AuthConfig;
use storefront::domain::{
    AuthResult, CurrentUser, NewProduct, Product, ProductStatus, RegisterUser, UserRole,
};
use storefront::infra::{DiskImageStore, Migrator};
use storefront::services::{ServiceContainer, Services};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-32-chars!";
pub const TEST_PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub services: Services,
    pub db: DatabaseConnection,
    pub admin: CurrentUser,
    pub dir: TempDir,
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(TEST_JWT_SECRET, Duration::minutes(15), Duration::days(7)).unwrap()
}

pub async fn setup() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("store.db").display());

    let mut options = ConnectOptions::new(url);
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let images = Arc::new(DiskImageStore::new(dir.path().join("images")));
    let services = Services::from_connection(db.clone(), auth_config(), images);

    let admin = services
        .auth()
        .register(RegisterUser {
            email: "admin@example.com".into(),
            password: TEST_PASSWORD.into(),
            full_name: Some("Store Admin".into()),
            role: Some(UserRole::Admin),
        })
        .await
        .unwrap();
    let admin = CurrentUser::new(admin.user.id, admin.user.email, admin.user.role);

    TestApp {
        services,
        db,
        admin,
        dir,
    }
}

impl TestApp {
    pub async fn register_customer(&self, email: &str) -> AuthResult {
        self.services
            .auth()
            .register(RegisterUser {
                email: email.into(),
                password: TEST_PASSWORD.into(),
                full_name: None,
                role: None,
            })
            .await
            .unwrap()
    }

    pub async fn customer(&self, email: &str) -> CurrentUser {
        let result = self.register_customer(email).await;
        CurrentUser::new(result.user.id, result.user.email, result.user.role)
    }

    /// Published product with the given price and stock
    pub async fn product(&self, name: &str, price_cents: i64, stock_qty: i32) -> Product {
        let slug = format!("{}-{}", name.to_lowercase().replace(' ', "-"), &Uuid::new_v4().to_string()[..8]);
        self.services
            .catalog()
            .create_product(
                &self.admin,
                NewProduct {
                    name: name.into(),
                    slug,
                    description: None,
                    price_cents,
                    stock_qty,
                    status: Some(ProductStatus::Published),
                    category_ids: vec![],
                    images: vec![],
                },
            )
            .await
            .unwrap()
            .product
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        self.services
            .catalog()
            .get_product(product_id)
            .await
            .unwrap()
            .product
            .stock_qty
    }
}
