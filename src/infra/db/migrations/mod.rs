//! Database migrations.
//!
//! Each migration is a separate module following SeaORM conventions.
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20251027_000001_create_users_and_tokens;
mod m20251027_000002_create_catalog;
mod m20251027_000003_create_carts;
mod m20251027_000004_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251027_000001_create_users_and_tokens::Migration),
            Box::new(m20251027_000002_create_catalog::Migration),
            Box::new(m20251027_000003_create_carts::Migration),
            Box::new(m20251027_000004_create_orders::Migration),
        ]
    }
}
