//! Operators (admin console accounts) live in their own identity space.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Operators::Table)
                    .if_not_exists()
                    .col(pk_auto(Operators::Id))
                    .col(string_uniq(Operators::Username))
                    .col(string_uniq(Operators::Email))
                    .col(string(Operators::PasswordHash))
                    .col(string(Operators::Role).default("admin"))
                    .col(boolean(Operators::IsActive).default(true))
                    .col(timestamp_with_time_zone_null(Operators::LastLogin))
                    .col(timestamp_with_time_zone(Operators::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Operators::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Operators {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    Role,
    IsActive,
    LastLogin,
    CreatedAt,
}
