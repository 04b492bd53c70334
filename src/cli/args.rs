//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

/// Storefront core - schema management and demo data
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run database migrations
    Migrate(MigrateArgs),

    /// Create the admin account and a sample catalog
    Seed(SeedArgs),
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the seed command
#[derive(Parser, Debug)]
pub struct SeedArgs {
    /// Only create the admin account
    #[arg(long)]
    pub admin_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_migrate_actions() {
        let cli = Cli::try_parse_from(["storefront", "migrate", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Migrate(MigrateArgs {
                action: MigrateAction::Status
            })
        ));
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["storefront", "seed", "--admin-only", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Seed(SeedArgs { admin_only: true })));
    }
}
