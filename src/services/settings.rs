//! Typed access to the key/value settings table.
//!
//! Values are stored as text. Readers fall back to the built-in default
//! when a key is missing or does not parse, and log a warning for the latter.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, warn};

use crate::error::LedgerError;
use crate::services::ledger_store::LedgerStore;

pub mod keys {
    pub const BITCOIN_WALLET_ADDRESS: &str = "bitcoin_wallet_address";
    pub const MINIMUM_DEPOSIT: &str = "minimum_deposit";
    pub const MINIMUM_WITHDRAWAL: &str = "minimum_withdrawal";
    pub const DEFAULT_PROFIT_RATE: &str = "default_profit_rate";
    pub const WITHDRAWAL_FEE: &str = "withdrawal_fee";
    pub const APP_MAINTENANCE: &str = "app_maintenance";
    pub const REGISTRATION_ENABLED: &str = "registration_enabled";
}

pub const DEFAULT_MINIMUM_DEPOSIT: Decimal = dec!(100.00);
pub const DEFAULT_MINIMUM_WITHDRAWAL: Decimal = dec!(50.00);

/// (key, default value, description); the wallet address comes from config
const DEFAULTS: &[(&str, &str, &str)] = &[
    (keys::MINIMUM_DEPOSIT, "100.00", "Minimum deposit amount in USD"),
    (keys::MINIMUM_WITHDRAWAL, "50.00", "Minimum withdrawal amount in USD"),
    (keys::DEFAULT_PROFIT_RATE, "2.5", "Default monthly profit rate percentage"),
    (keys::WITHDRAWAL_FEE, "5.00", "Withdrawal processing fee in USD"),
    (keys::APP_MAINTENANCE, "false", "Application maintenance mode"),
    (keys::REGISTRATION_ENABLED, "true", "Allow new user registrations"),
];

/// Whether `value` is acceptable for `key`
pub fn validate_value(key: &str, value: &str) -> Result<(), LedgerError> {
    let value = value.trim();
    let ok = match key {
        keys::MINIMUM_DEPOSIT
        | keys::MINIMUM_WITHDRAWAL
        | keys::DEFAULT_PROFIT_RATE
        | keys::WITHDRAWAL_FEE => Decimal::from_str(value)
            .map(|d| !d.is_sign_negative() || d.is_zero())
            .unwrap_or(false),
        keys::APP_MAINTENANCE | keys::REGISTRATION_ENABLED => parse_flag(value).is_some(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(LedgerError::validation(
            "value",
            format!("'{}' is not a valid value for {}", value, key),
        ))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Insert any missing defaults; existing values are never overwritten.
pub async fn ensure_defaults(store: &LedgerStore, wallet_address: &str) -> Result<(), LedgerError> {
    let mut seeded = 0;
    if store
        .insert_setting_if_missing(
            keys::BITCOIN_WALLET_ADDRESS,
            wallet_address,
            "Bitcoin wallet address for deposits",
        )
        .await?
    {
        seeded += 1;
    }
    for (key, value, description) in DEFAULTS {
        if store.insert_setting_if_missing(key, value, description).await? {
            seeded += 1;
        }
    }
    if seeded > 0 {
        info!(seeded, "Seeded default settings");
    }
    Ok(())
}

async fn raw(store: &LedgerStore, key: &str) -> Result<Option<String>, LedgerError> {
    Ok(store.setting(key).await?.map(|s| s.setting_value))
}

async fn decimal_or(store: &LedgerStore, key: &str, fallback: Decimal) -> Result<Decimal, LedgerError> {
    match raw(store, key).await? {
        None => Ok(fallback),
        Some(value) => match Decimal::from_str(value.trim()) {
            Ok(parsed) => Ok(parsed),
            Err(_) => {
                warn!(key, value = %value, "Unparsable setting, using default");
                Ok(fallback)
            }
        },
    }
}

async fn flag_or(store: &LedgerStore, key: &str, fallback: bool) -> Result<bool, LedgerError> {
    match raw(store, key).await? {
        None => Ok(fallback),
        Some(value) => Ok(parse_flag(&value).unwrap_or_else(|| {
            warn!(key, value = %value, "Unparsable flag, using default");
            fallback
        })),
    }
}

pub async fn minimum_withdrawal(store: &LedgerStore) -> Result<Decimal, LedgerError> {
    decimal_or(store, keys::MINIMUM_WITHDRAWAL, DEFAULT_MINIMUM_WITHDRAWAL).await
}

pub async fn minimum_deposit(store: &LedgerStore) -> Result<Decimal, LedgerError> {
    decimal_or(store, keys::MINIMUM_DEPOSIT, DEFAULT_MINIMUM_DEPOSIT).await
}

pub async fn maintenance_enabled(store: &LedgerStore) -> Result<bool, LedgerError> {
    flag_or(store, keys::APP_MAINTENANCE, false).await
}

pub async fn registration_enabled(store: &LedgerStore) -> Result<bool, LedgerError> {
    flag_or(store, keys::REGISTRATION_ENABLED, true).await
}

/// Stored address, or `fallback` when the setting is missing or blank
pub async fn wallet_address(store: &LedgerStore, fallback: &str) -> Result<String, LedgerError> {
    Ok(raw(store, keys::BITCOIN_WALLET_ADDRESS)
        .await?
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_value_validation_by_key() {
        assert!(validate_value(keys::MINIMUM_WITHDRAWAL, "75.00").is_ok());
        assert!(validate_value(keys::MINIMUM_WITHDRAWAL, "-1").is_err());
        assert!(validate_value(keys::APP_MAINTENANCE, "sometimes").is_err());
        assert!(validate_value("support_banner", "anything goes").is_ok());
    }
}
