//! Per-user investment snapshot. Money columns keep two decimals.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InvestmentSnapshots::Table)
                    .if_not_exists()
                    .col(pk_auto(InvestmentSnapshots::Id))
                    .col(integer_uniq(InvestmentSnapshots::UserId))
                    .col(decimal_len(InvestmentSnapshots::InitialDeposit, 15, 2).default(0))
                    .col(decimal_len(InvestmentSnapshots::MonthlyTopup, 15, 2).default(0))
                    .col(decimal_len(InvestmentSnapshots::TotalDeposited, 15, 2).default(0))
                    .col(decimal_len(InvestmentSnapshots::CurrentProfit, 15, 2).default(0))
                    .col(decimal_len(InvestmentSnapshots::TargetCash, 15, 2).default(500000))
                    .col(decimal_len(InvestmentSnapshots::CurrentBalance, 15, 2).default(0))
                    .col(decimal_len(InvestmentSnapshots::ProgressPercentage, 5, 2).default(0))
                    .col(
                        timestamp_with_time_zone(InvestmentSnapshots::InvestmentStartDate)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(InvestmentSnapshots::LastUpdated)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_investment_snapshots_user_id")
                            .from(InvestmentSnapshots::Table, InvestmentSnapshots::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InvestmentSnapshots::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InvestmentSnapshots {
    Table,
    Id,
    UserId,
    InitialDeposit,
    MonthlyTopup,
    TotalDeposited,
    CurrentProfit,
    TargetCash,
    CurrentBalance,
    ProgressPercentage,
    InvestmentStartDate,
    LastUpdated,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
