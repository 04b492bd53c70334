//! Migrate command - Database migration management.

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::Database;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: &Config) -> AppResult<()> {
    // Connect without auto-running migrations for manual control
    let db = Database::connect_without_migrations(config).await?;

    match args.action {
        MigrateAction::Up => {
            tracing::info!("Running pending migrations...");
            db.run_migrations().await?;
            tracing::info!("Migrations completed successfully");
        }
        MigrateAction::Down => {
            tracing::info!("Rolling back last migration...");
            db.rollback_migration().await?;
            tracing::info!("Rollback completed successfully");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            let pending = status.iter().filter(|(_, applied)| !applied).count();
            for (name, applied) in &status {
                println!("{}: {}", name, if *applied { "applied" } else { "pending" });
            }
            println!("{} of {} migrations pending", pending, status.len());
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping all tables and re-running every migration...");
            db.fresh_migrations().await?;
            tracing::info!("Fresh migrations completed successfully");
        }
    }

    Ok(())
}
