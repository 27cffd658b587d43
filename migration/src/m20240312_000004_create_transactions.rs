//! Append-only transaction records.
//!
//! `processed_by` is a non-owning pointer to the operator who recorded the
//! row; removing the operator clears it instead of removing the record.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_auto(Transactions::Id))
                    .col(integer(Transactions::UserId))
                    .col(string(Transactions::TransactionType))
                    .col(decimal_len(Transactions::Amount, 15, 2))
                    .col(string_null(Transactions::TransactionHash))
                    .col(string(Transactions::Status).default("pending"))
                    .col(text_null(Transactions::Description))
                    .col(string_null(Transactions::ReceiptRef))
                    .col(integer_null(Transactions::ProcessedBy))
                    .col(timestamp_with_time_zone(Transactions::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(Transactions::ProcessedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_user_id")
                            .from(Transactions::Table, Transactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_processed_by")
                            .from(Transactions::Table, Transactions::ProcessedBy)
                            .to(Operators::Table, Operators::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // History pages are per user, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_user_created")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    UserId,
    TransactionType,
    Amount,
    TransactionHash,
    Status,
    Description,
    ReceiptRef,
    ProcessedBy,
    CreatedAt,
    ProcessedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Operators {
    Table,
    Id,
}
