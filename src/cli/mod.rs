//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `migrate` - Database migrations
//! - `seed` - Admin account and sample catalog

pub mod args;

pub use args::{Cli, Commands};
