use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WithdrawalRequests::Table)
                    .if_not_exists()
                    .col(pk_auto(WithdrawalRequests::Id))
                    .col(integer(WithdrawalRequests::UserId))
                    .col(decimal_len(WithdrawalRequests::Amount, 15, 2))
                    .col(string(WithdrawalRequests::WithdrawalAddress))
                    .col(string(WithdrawalRequests::Status).default("pending"))
                    .col(text_null(WithdrawalRequests::Reason))
                    .col(string_null(WithdrawalRequests::ReceiptRef))
                    .col(integer_null(WithdrawalRequests::ProcessedBy))
                    .col(
                        timestamp_with_time_zone(WithdrawalRequests::RequestedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone_null(WithdrawalRequests::ProcessedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawal_requests_user_id")
                            .from(WithdrawalRequests::Table, WithdrawalRequests::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_withdrawal_requests_processed_by")
                            .from(WithdrawalRequests::Table, WithdrawalRequests::ProcessedBy)
                            .to(Operators::Table, Operators::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Operator console polls pending requests
        manager
            .create_index(
                Index::create()
                    .name("idx_withdrawal_requests_status")
                    .table(WithdrawalRequests::Table)
                    .col(WithdrawalRequests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_withdrawal_requests_user_id")
                    .table(WithdrawalRequests::Table)
                    .col(WithdrawalRequests::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WithdrawalRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WithdrawalRequests {
    Table,
    Id,
    UserId,
    Amount,
    WithdrawalAddress,
    Status,
    Reason,
    ReceiptRef,
    ProcessedBy,
    RequestedAt,
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
