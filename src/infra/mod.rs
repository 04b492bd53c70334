//! Infrastructure layer - External systems integration
//!
//! - Database connection and migrations
//! - Repositories over the relational store
//! - Unit of Work for transaction management
//! - Product image file storage

pub mod db;
pub mod image_store;
pub mod repositories;
pub mod unit_of_work;

pub use db::{Database, Migrator};
pub use image_store::{image_file_name, DiskImageStore, ImageStore};
pub use repositories::{
    CartRepository, CategoryRepository, OrderRepository, ProductRepository, UserRepository,
};
pub use unit_of_work::{Persistence, TransactionContext, UnitOfWork};

#[cfg(any(test, feature = "test-utils"))]
pub use image_store::MockImageStore;
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    MockCartRepository, MockCategoryRepository, MockOrderRepository, MockProductRepository,
    MockUserRepository,
};
