//! Repository layer - Data access abstraction
//!
//! Pooled stores behind traits for reads and single-statement writes, plus
//! transaction-bound repositories for the multi-row workflows.

mod cart_repository;
mod category_repository;
pub(crate) mod entities;
pub(crate) mod loaders;
mod order_repository;
mod product_repository;
mod transactional;
mod user_repository;

pub use cart_repository::{CartRepository, CartStore};
pub use category_repository::{CategoryRepository, CategoryStore};
pub use order_repository::{OrderRepository, OrderStore};
pub use product_repository::{ProductRepository, ProductStore};
pub use transactional::{
    TxCartRepository, TxOrderRepository, TxProductRepository, TxTokenRepository,
    TxUserRepository,
};
pub use user_repository::{UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use cart_repository::MockCartRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use category_repository::MockCategoryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use order_repository::MockOrderRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use product_repository::MockProductRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
