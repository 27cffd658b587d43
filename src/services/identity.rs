//! Identity boundary
//!
//! Issues and verifies HS256 identity assertions naming a user or an
//! operator, hashes credentials with Argon2id, and provides the axum
//! extractors that guard the user and operator routes.

use std::net::SocketAddr;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use lazy_static::lazy_static;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::entities::{operators, users};
use crate::error::LedgerError;
use crate::models::auth::Role;
use crate::models::common::ErrorResponse;
use crate::services::ledger_store::LedgerStore;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct IdentityService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    user_ttl: Duration,
    operator_ttl: Duration,
}

impl IdentityService {
    pub fn new(secret: &str, user_ttl_hours: i64, operator_ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            user_ttl: Duration::hours(user_ttl_hours),
            operator_ttl: Duration::hours(operator_ttl_hours),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.jwt_secret,
            config.user_token_ttl_hours,
            config.operator_token_ttl_hours,
        )
    }

    pub fn issue(&self, subject_id: i32, role: Role) -> Result<String, LedgerError> {
        let now = Utc::now();
        let ttl = match role {
            Role::User => self.user_ttl,
            Role::Operator => self.operator_ttl,
        };
        let claims = Claims {
            sub: subject_id,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| LedgerError::Internal(format!("token signing failed: {}", e)))
    }

    /// Any failure (bad signature, expiry, garbage) is plain `Unauthorized`
    pub fn verify(&self, token: &str) -> Result<Claims, LedgerError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected identity assertion");
                LedgerError::Unauthorized
            })
    }
}

pub fn hash_password(password: &str) -> Result<String, LedgerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| LedgerError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Argon2 is deliberately slow; keep it off the async workers
pub async fn hash_password_async(password: String) -> Result<String, LedgerError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| LedgerError::Internal(format!("hashing task failed: {}", e)))?
}

pub async fn verify_password_async(password: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .unwrap_or(false)
}

lazy_static! {
    /// Checked in place of a stored hash when the account does not exist
    static ref UNKNOWN_ACCOUNT_HASH: String =
        hash_password("unknown-account-placeholder").unwrap_or_default();
}

/// Burn one verification for a missing account, then refuse
async fn reject_unknown_account(password: &str) -> LedgerError {
    verify_password_async(password.to_string(), UNKNOWN_ACCOUNT_HASH.clone()).await;
    LedgerError::Unauthorized
}

/// Credential check for end users. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn authenticate_user(
    store: &LedgerStore,
    email: &str,
    password: &str,
) -> Result<users::Model, LedgerError> {
    let Some(user) = store.find_user_by_email(email).await? else {
        return Err(reject_unknown_account(password).await);
    };
    if !user.is_active {
        return Err(LedgerError::AccountDisabled);
    }
    if !verify_password_async(password.to_string(), user.password_hash.clone()).await {
        return Err(LedgerError::Unauthorized);
    }
    Ok(user)
}

/// The single operator credential check behind every operator login route
pub async fn authenticate_operator(
    store: &LedgerStore,
    username: &str,
    password: &str,
) -> Result<operators::Model, LedgerError> {
    let Some(operator) = store.find_operator_by_username(username).await? else {
        return Err(reject_unknown_account(password).await);
    };
    if !operator.is_active {
        return Err(LedgerError::AccountDisabled);
    }
    if !verify_password_async(password.to_string(), operator.password_hash.clone()).await {
        return Err(LedgerError::Unauthorized);
    }
    store.touch_operator_login(operator.id).await?;
    Ok(operator)
}

fn bearer_token(parts: &Parts) -> Result<&str, LedgerError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(LedgerError::Unauthorized)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(LedgerError::Unauthorized)
}

/// Verified claims of any role, for `/api/auth/verify`
pub struct VerifiedClaims(pub Claims);

impl FromRequestParts<AppState> for VerifiedClaims {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        Ok(VerifiedClaims(state.identity.verify(token)?))
    }
}

/// An active end user holding a valid user assertion
pub struct UserIdentity(pub users::Model);

impl FromRequestParts<AppState> for UserIdentity {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state.identity.verify(bearer_token(parts)?)?;
        if claims.role != Role::User {
            return Err(LedgerError::Unauthorized.into());
        }
        let user = state
            .store
            .find_user(claims.sub)
            .await?
            .ok_or(LedgerError::Unauthorized)?;
        if !user.is_active {
            return Err(LedgerError::AccountDisabled.into());
        }
        Ok(UserIdentity(user))
    }
}

/// An active operator holding a valid operator assertion
pub struct OperatorIdentity(pub operators::Model);

impl FromRequestParts<AppState> for OperatorIdentity {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = state.identity.verify(bearer_token(parts)?)?;
        if claims.role != Role::Operator {
            return Err(LedgerError::Unauthorized.into());
        }
        let operator = state
            .store
            .find_operator(claims.sub)
            .await?
            .ok_or(LedgerError::Unauthorized)?;
        if !operator.is_active {
            return Err(LedgerError::AccountDisabled.into());
        }
        Ok(OperatorIdentity(operator))
    }
}

/// Caller address and agent, recorded with activity log entries
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_str = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let forwarded = header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()));
        let ip_address = forwarded.or_else(|| header_str("x-real-ip")).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Ok(RequestMeta {
            ip_address,
            user_agent: header_str(header::USER_AGENT.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService {
        IdentityService::new("unit-test-secret-0123456789", 24, 8)
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let svc = service();
        let token = svc.issue(12, Role::Operator).unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, 12);
        assert_eq!(claims.role, Role::Operator);
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = IdentityService::new("another-secret-abcdefghijk", 24, 8);
        let token = other.issue(1, Role::User).unwrap();
        assert!(matches!(service().verify(&token), Err(LedgerError::Unauthorized)));
        assert!(matches!(service().verify("not.a.token"), Err(LedgerError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = IdentityService::new("unit-test-secret-0123456789", -1, 8);
        let token = svc.issue(1, Role::User).unwrap();
        assert!(svc.verify(&token).is_err());
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_unknown_account_hash_is_a_real_argon2_hash() {
        assert!(UNKNOWN_ACCOUNT_HASH.starts_with("$argon2id$"));
        assert!(PasswordHash::new(&UNKNOWN_ACCOUNT_HASH).is_ok());
        assert!(!verify_password("password123", &UNKNOWN_ACCOUNT_HASH));
    }
}
