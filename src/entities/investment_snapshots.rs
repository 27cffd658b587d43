//! SeaORM Entity for the per-user investment snapshot
//!
//! Only written through the reconciler; see `services::reconciler`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "investment_snapshots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub initial_deposit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub monthly_topup: Decimal,
    /// initial_deposit + monthly_topup
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_deposited: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub current_profit: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub target_cash: Decimal,
    /// total_deposited + current_profit
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub current_balance: Decimal,
    /// Percentage of target reached, clamped to [0, 100]
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub progress_percentage: Decimal,
    pub investment_start_date: DateTimeUtc,
    pub last_updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
