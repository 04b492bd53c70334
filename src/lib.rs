//! Storefront core - catalog, carts, checkout and sessions
//!
//! The transactional heart of an e-commerce storefront: the checkout that
//! turns a cart into an order while reserving stock under row locks, the
//! one-active-cart-per-user lifecycle, and refresh-token rotation. HTTP
//! routing and presentation live outside this crate.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities and logic
//! - **services**: Application use cases and business logic
//! - **infra**: Infrastructure concerns (database, image storage)
//! - **types**: Shared types (pagination)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Create the admin account and a sample catalog
//! cargo run -- seed
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{AuthConfig, Config};
pub use domain::{Cart, CurrentUser, Order, Password, Product, User, UserRole};
pub use errors::{AppError, AppResult};
pub use services::{ServiceContainer, Services};
