pub use sea_orm_migration::prelude::*;

mod m20240312_000001_create_users;
mod m20240312_000002_create_operators;
mod m20240312_000003_create_investment_snapshots;
mod m20240312_000004_create_transactions;
mod m20240312_000005_create_withdrawal_requests;
mod m20240312_000006_create_settings;
mod m20240312_000007_create_activity_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240312_000001_create_users::Migration),
            Box::new(m20240312_000002_create_operators::Migration),
            Box::new(m20240312_000003_create_investment_snapshots::Migration),
            Box::new(m20240312_000004_create_transactions::Migration),
            Box::new(m20240312_000005_create_withdrawal_requests::Migration),
            Box::new(m20240312_000006_create_settings::Migration),
            Box::new(m20240312_000007_create_activity_logs::Migration),
        ]
    }
}
