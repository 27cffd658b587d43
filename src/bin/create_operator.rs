use std::env;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

use mpi_ledger_backend::models::auth::{normalize_email, MIN_PASSWORD_LENGTH};
use mpi_ledger_backend::services::bootstrap::DEFAULT_OPERATOR_ROLE;
use mpi_ledger_backend::services::identity::hash_password;
use mpi_ledger_backend::services::ledger_store::{LedgerStore, NewOperatorRecord};

/// Provision an operator account.
///
/// The password is read from `OPERATOR_PASSWORD` so it stays out of shell history.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        eprintln!("Usage: OPERATOR_PASSWORD=... {} <username> <email> [role]", args[0]);
        eprintln!("Example: OPERATOR_PASSWORD=s3cret-pass {} ops_alice alice@example.com", args[0]);
        std::process::exit(1);
    }

    let username = args[1].trim().to_string();
    let email = normalize_email(&args[2]).ok_or("email address is not valid")?;
    let role = args
        .get(3)
        .map(|r| r.trim().to_string())
        .unwrap_or_else(|| DEFAULT_OPERATOR_ROLE.to_string());

    dotenvy::dotenv().ok();
    let password = env::var("OPERATOR_PASSWORD")?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("password must be at least {} characters", MIN_PASSWORD_LENGTH).into());
    }

    let db = Database::connect(env::var("DATABASE_URL")?).await?;
    migration::Migrator::up(&db, None).await?;
    let store = LedgerStore::new(db);

    let operator = store
        .create_operator(NewOperatorRecord {
            username,
            email,
            password_hash: hash_password(&password)?,
            role,
        })
        .await?;

    println!(
        "✅ Created operator #{} '{}' <{}> with role {}",
        operator.id, operator.username, operator.email, operator.role
    );
    Ok(())
}
