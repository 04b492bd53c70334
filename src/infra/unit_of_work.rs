//! Unit of Work pattern implementation.
//!
//! The Unit of Work:
//! - Centralizes access to all repositories
//! - Manages database transactions (begin, commit, rollback)
//! - Ensures checkout, registration and token rotation are all-or-nothing

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    IsolationLevel, TransactionTrait,
};
use std::sync::Arc;

use super::repositories::{
    CartRepository, CartStore, CategoryRepository, CategoryStore, OrderRepository, OrderStore,
    ProductRepository, ProductStore, TxCartRepository, TxOrderRepository, TxProductRepository,
    TxTokenRepository, TxUserRepository, UserRepository, UserStore,
};
use crate::errors::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
///
/// Provides centralized access to all repositories and transaction management.
/// Note: This trait is not mockable directly due to generic methods.
/// For testing, mock the repositories and wrap them in a test unit of work.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> Arc<dyn UserRepository>;

    fn products(&self) -> Arc<dyn ProductRepository>;

    fn categories(&self) -> Arc<dyn CategoryRepository>;

    fn carts(&self) -> Arc<dyn CartRepository>;

    fn orders(&self) -> Arc<dyn OrderRepository>;

    /// Execute a closure within a transaction.
    ///
    /// The transaction is committed when the closure returns `Ok` and rolled
    /// back when it returns `Err`; nothing written inside it is visible to
    /// anyone else before the commit.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    pub fn users(&self) -> TxUserRepository<'_> {
        TxUserRepository::new(self.txn)
    }

    pub fn tokens(&self) -> TxTokenRepository<'_> {
        TxTokenRepository::new(self.txn)
    }

    pub fn products(&self) -> TxProductRepository<'_> {
        TxProductRepository::new(self.txn)
    }

    pub fn carts(&self) -> TxCartRepository<'_> {
        TxCartRepository::new(self.txn)
    }

    pub fn orders(&self) -> TxOrderRepository<'_> {
        TxOrderRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    user_repo: Arc<UserStore>,
    product_repo: Arc<ProductStore>,
    category_repo: Arc<CategoryStore>,
    cart_repo: Arc<CartStore>,
    order_repo: Arc<OrderStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            user_repo: Arc::new(UserStore::new(db.clone())),
            product_repo: Arc::new(ProductStore::new(db.clone())),
            category_repo: Arc::new(CategoryStore::new(db.clone())),
            cart_repo: Arc::new(CartStore::new(db.clone())),
            order_repo: Arc::new(OrderStore::new(db.clone())),
            db,
        }
    }

    async fn begin(&self) -> AppResult<DatabaseTransaction> {
        let txn = match self.db.get_database_backend() {
            // SQLite has neither per-transaction isolation levels nor access modes
            DbBackend::Sqlite => self.db.begin().await?,
            _ => {
                self.db
                    .begin_with_config(
                        Some(IsolationLevel::ReadCommitted),
                        Some(AccessMode::ReadWrite),
                    )
                    .await?
            }
        };
        Ok(txn)
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn products(&self) -> Arc<dyn ProductRepository> {
        self.product_repo.clone()
    }

    fn categories(&self) -> Arc<dyn CategoryRepository> {
        self.category_repo.clone()
    }

    fn carts(&self) -> Arc<dyn CartRepository> {
        self.cart_repo.clone()
    }

    fn orders(&self) -> Arc<dyn OrderRepository> {
        self.order_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        // ReadCommitted is enough: rows that must not change underneath the
        // closure are locked explicitly
        let txn = self.begin().await?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Shorthand for running a block inside `UnitOfWork::transaction`.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
