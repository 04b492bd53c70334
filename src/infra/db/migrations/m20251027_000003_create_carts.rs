//! Migration: carts and cart items.

use sea_orm_migration::prelude::*;

use super::m20251027_000001_create_users_and_tokens::Users;
use super::m20251027_000002_create_catalog::Products;

/// At most one active cart per user, enforced by the store.
const ACTIVE_CART_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS carts_user_id_active_unique \
     ON carts (user_id) WHERE status = 'active'";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Carts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Carts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Carts::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Carts::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Carts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Carts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_carts_user_id")
                            .from(Carts::Table, Carts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Partial indexes are not expressible through the schema builder
        manager
            .get_connection()
            .execute_unprepared(ACTIVE_CART_INDEX)
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CartItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CartItems::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CartItems::CartId).uuid().not_null())
                    .col(ColumnDef::new(CartItems::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(CartItems::Quantity)
                            .integer()
                            .not_null()
                            .check(Expr::col(CartItems::Quantity).gt(0)),
                    )
                    .col(ColumnDef::new(CartItems::PriceCents).big_integer().not_null())
                    .col(
                        ColumnDef::new(CartItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_items_cart_id")
                            .from(CartItems::Table, CartItems::CartId)
                            .to(Carts::Table, Carts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cart_items_product_id")
                            .from(CartItems::Table, CartItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cart_items_cart_id_product_id")
                    .table(CartItems::Table)
                    .col(CartItems::CartId)
                    .col(CartItems::ProductId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CartItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Carts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Carts {
    Table,
    Id,
    UserId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CartItems {
    Table,
    Id,
    CartId,
    ProductId,
    Quantity,
    PriceCents,
    CreatedAt,
}
