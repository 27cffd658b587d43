//! `migrate` CLI for the ledger schema (`up`, `down`, `status`, `fresh`, ...).
//! Reads `DATABASE_URL` from the environment.

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    cli::run_cli(migration::Migrator).await;
}
