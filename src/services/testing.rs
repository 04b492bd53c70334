//! Test doubles for service unit tests.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::SecretHasher;
use crate::errors::{AppError, AppResult};
use crate::infra::{
    CartRepository, CategoryRepository, MockCartRepository, MockCategoryRepository,
    MockOrderRepository, MockProductRepository, MockUserRepository, OrderRepository,
    ProductRepository, TransactionContext, UnitOfWork, UserRepository,
};

/// Unit of work over mocked repositories.
///
/// Transactions need a real connection; services exercising them are
/// covered by the integration tests instead.
#[derive(Default)]
pub(crate) struct TestUnitOfWork {
    users: Arc<MockUserRepository>,
    products: Arc<MockProductRepository>,
    categories: Arc<MockCategoryRepository>,
    carts: Arc<MockCartRepository>,
    orders: Arc<MockOrderRepository>,
}

impl TestUnitOfWork {
    pub(crate) fn with_users(mut self, users: MockUserRepository) -> Self {
        self.users = Arc::new(users);
        self
    }

    pub(crate) fn with_products(mut self, products: MockProductRepository) -> Self {
        self.products = Arc::new(products);
        self
    }

    pub(crate) fn with_categories(mut self, categories: MockCategoryRepository) -> Self {
        self.categories = Arc::new(categories);
        self
    }

    pub(crate) fn with_carts(mut self, carts: MockCartRepository) -> Self {
        self.carts = Arc::new(carts);
        self
    }

    pub(crate) fn with_orders(mut self, orders: MockOrderRepository) -> Self {
        self.orders = Arc::new(orders);
        self
    }
}

#[async_trait]
impl UnitOfWork for TestUnitOfWork {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        self.products.clone()
    }

    fn categories(&self) -> Arc<dyn CategoryRepository> {
        self.categories.clone()
    }

    fn carts(&self) -> Arc<dyn CartRepository> {
        self.carts.clone()
    }

    fn orders(&self) -> Arc<dyn OrderRepository> {
        self.orders.clone()
    }

    async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        Err(AppError::internal("transactions are not available in unit tests"))
    }
}

/// Reversible stand-in for Argon2 so unit tests stay fast.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PlainHasher;

impl SecretHasher for PlainHasher {
    fn hash(&self, plain_text: &str) -> AppResult<String> {
        Ok(format!("hashed:{}", plain_text))
    }

    fn verify(&self, hash: &str, plain_text: &str) -> bool {
        hash.strip_prefix("hashed:") == Some(plain_text)
    }
}
