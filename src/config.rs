//! Process configuration, read once at start-up from the environment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

const MIN_JWT_SECRET_LENGTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

/// Default operator seeded at start-up
#[derive(Debug, Clone)]
pub struct DefaultOperator {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub app_env: AppEnv,
    pub jwt_secret: String,
    pub user_token_ttl_hours: i64,
    pub operator_token_ttl_hours: i64,
    pub bitcoin_wallet_address: String,
    pub default_operator: Option<DefaultOperator>,
    pub receipts_dir: PathBuf,
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: format!("must be at least {} characters", MIN_JWT_SECRET_LENGTH),
            });
        }

        let bind_addr = optional("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let app_env = match optional("APP_ENV").as_deref() {
            Some("development") | Some("dev") => AppEnv::Development,
            None | Some("production") | Some("prod") => AppEnv::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "APP_ENV",
                    reason: format!("unknown environment '{}'", other),
                })
            }
        };

        let default_operator = optional("ADMIN_PASSWORD").map(|password| {
            let username = optional("ADMIN_USERNAME").unwrap_or_else(|| "mpi_admin".to_string());
            let email = optional("ADMIN_EMAIL").unwrap_or_else(|| format!("{}@localhost", username));
            DefaultOperator {
                username,
                email,
                password,
            }
        });

        Ok(Self {
            database_url,
            bind_addr,
            app_env,
            jwt_secret,
            user_token_ttl_hours: hours("USER_TOKEN_TTL_HOURS", 24)?,
            operator_token_ttl_hours: hours("OPERATOR_TOKEN_TTL_HOURS", 8)?,
            bitcoin_wallet_address: optional("BITCOIN_WALLET_ADDRESS").unwrap_or_default(),
            default_operator,
            receipts_dir: optional("RECEIPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads/receipts")),
            mail_relay_url: optional("MAIL_RELAY_URL"),
            mail_from: optional("MAIL_FROM").unwrap_or_else(|| "no-reply@localhost".to_string()),
            contact_email: optional("CONTACT_EMAIL").unwrap_or_default(),
            contact_phone: optional("CONTACT_PHONE").unwrap_or_default(),
            cors_origin: optional("CORS_ORIGIN"),
        })
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

/// Unset and blank are treated the same
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn hours(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => match raw.parse::<i64>() {
            Ok(h) if h > 0 => Ok(h),
            _ => Err(ConfigError::Invalid {
                name,
                reason: format!("'{}' is not a positive number of hours", raw),
            }),
        },
    }
}
