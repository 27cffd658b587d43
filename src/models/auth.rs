//! Authentication request/response models
//!
//! Models for `/api/auth/*`: registration, user and operator login, token
//! verification.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::{operators, users};
use crate::error::{FieldError, LedgerError};

lazy_static! {
    // Deliberately loose: one '@', no whitespace, a dot in the domain
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MIN_NAME_LENGTH: usize = 2;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Who an identity assertion speaks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Operator,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Operator => write!(f, "operator"),
        }
    }
}

/// Trim and lower-case; returns None when the shape is not an email
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    EMAIL_REGEX.is_match(&email).then_some(email)
}

pub(crate) fn check_name(field: &str, label: &str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().chars().count() < MIN_NAME_LENGTH {
        errors.push(FieldError::new(
            field,
            format!("{} must be at least {} characters", label, MIN_NAME_LENGTH),
        ));
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration input after boundary validation
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, LedgerError> {
        let mut errors = Vec::new();
        check_name("firstName", "First name", &self.first_name, &mut errors);
        check_name("lastName", "Last name", &self.last_name, &mut errors);

        let email = normalize_email(&self.email);
        if email.is_none() {
            errors.push(FieldError::new("email", "Please provide a valid email"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.push(FieldError::new(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            ));
        }

        match email {
            Some(email) if errors.is_empty() => Ok(NewUser {
                first_name: self.first_name.trim().to_string(),
                last_name: self.last_name.trim().to_string(),
                email,
                password: self.password,
            }),
            _ => Err(LedgerError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Returns the normalized email
    pub fn validate(&self) -> Result<String, LedgerError> {
        let mut errors = Vec::new();
        let email = normalize_email(&self.email);
        if email.is_none() {
            errors.push(FieldError::new("email", "Please provide a valid email"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        match email {
            Some(email) if errors.is_empty() => Ok(email),
            _ => Err(LedgerError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperatorLoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl OperatorLoginRequest {
    pub fn validate(&self) -> Result<(), LedgerError> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push(FieldError::new("username", "Username is required"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "Password is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Validation(errors))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&users::Model> for UserSummary {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&operators::Model> for OperatorSummary {
    fn from(operator: &operators::Model) -> Self {
        Self {
            id: operator.id,
            username: operator.username.clone(),
            email: operator.email.clone(),
            role: operator.role.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserAuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OperatorAuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub admin: OperatorSummary,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSubject {
    pub subject_id: i32,
    pub role: Role,
    pub expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub subject: VerifiedSubject,
}
