//! Start-up seeding: default settings and the default operator account.

use tracing::info;

use crate::config::AppConfig;
use crate::entities::operators;
use crate::error::LedgerError;
use crate::services::identity::hash_password_async;
use crate::services::ledger_store::{LedgerStore, NewOperatorRecord};
use crate::services::settings;

pub const DEFAULT_OPERATOR_ROLE: &str = "admin";

pub async fn run(store: &LedgerStore, config: &AppConfig) -> Result<(), LedgerError> {
    settings::ensure_defaults(store, &config.bitcoin_wallet_address).await?;

    if let Some(default) = &config.default_operator {
        seed_operator(store, &default.username, &default.email, &default.password).await?;
    } else {
        info!("ADMIN_PASSWORD not set; skipping default operator seeding");
    }
    Ok(())
}

/// Create the operator unless one with that username already exists.
/// Returns the created row, or None when nothing was done.
pub async fn seed_operator(
    store: &LedgerStore,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Option<operators::Model>, LedgerError> {
    if store.find_operator_by_username(username).await?.is_some() {
        info!(username, "Default operator already present");
        return Ok(None);
    }

    let password_hash = hash_password_async(password.to_string()).await?;
    let created = store
        .create_operator(NewOperatorRecord {
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            role: DEFAULT_OPERATOR_ROLE.to_string(),
        })
        .await?;
    info!(operator_id = created.id, username = %created.username, "Seeded default operator");
    Ok(Some(created))
}
