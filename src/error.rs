//! Error taxonomy shared by the ledger services and the HTTP layer.
//!
//! Business and validation failures travel to the caller verbatim. Storage
//! failures are logged here and answered with a generic message unless the
//! process runs with `APP_ENV=development`.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{http::StatusCode, Json};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::models::common::ErrorResponse;

static EXPOSE_INTERNAL_DETAIL: AtomicBool = AtomicBool::new(false);

/// Allow storage/internal error detail in response bodies (development only).
pub fn expose_internal_detail(enabled: bool) {
    EXPOSE_INTERNAL_DETAIL.store(enabled, Ordering::Relaxed);
}

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Target cash cannot be negative")]
    InvalidTarget,

    #[error("Invalid transaction type: {0}")]
    InvalidType(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid or expired credentials")]
    Unauthorized,

    #[error("Account is deactivated. Please contact support.")]
    AccountDisabled,

    #[error("{0}")]
    Forbidden(String),

    #[error("User with this email already exists")]
    DuplicateEmail,

    #[error("Operator with this username or email already exists")]
    DuplicateUsername,

    #[error("Withdrawal request has already been processed")]
    AlreadyProcessed,

    #[error("Insufficient balance for withdrawal")]
    InsufficientBalance,

    #[error("Service is temporarily under maintenance")]
    Maintenance,

    #[error("Database error: {0}")]
    Storage(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        LedgerError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::Validation(_)
            | LedgerError::InvalidAmount(_)
            | LedgerError::InvalidTarget
            | LedgerError::InvalidType(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Unauthorized | LedgerError::AccountDisabled => StatusCode::UNAUTHORIZED,
            LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LedgerError::DuplicateEmail
            | LedgerError::DuplicateUsername
            | LedgerError::AlreadyProcessed
            | LedgerError::InsufficientBalance => StatusCode::CONFLICT,
            LedgerError::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            LedgerError::Storage(_) | LedgerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "VALIDATION_FAILED",
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::InvalidTarget => "INVALID_TARGET",
            LedgerError::InvalidType(_) => "INVALID_TYPE",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::Unauthorized => "UNAUTHORIZED",
            LedgerError::AccountDisabled => "ACCOUNT_DISABLED",
            LedgerError::Forbidden(_) => "FORBIDDEN",
            LedgerError::DuplicateEmail => "DUPLICATE_EMAIL",
            LedgerError::DuplicateUsername => "DUPLICATE_USERNAME",
            LedgerError::AlreadyProcessed => "ALREADY_PROCESSED",
            LedgerError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            LedgerError::Maintenance => "MAINTENANCE",
            LedgerError::Storage(_) => "STORAGE_ERROR",
            LedgerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, LedgerError::Storage(_) | LedgerError::Internal(_))
    }
}

impl From<LedgerError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: LedgerError) -> Self {
        let status = err.status();
        let code = err.code();

        if err.is_internal() {
            error!(error = %err, code = code, "Request failed with internal error");
            let detail = EXPOSE_INTERNAL_DETAIL
                .load(Ordering::Relaxed)
                .then(|| err.to_string());
            return (
                status,
                Json(ErrorResponse {
                    success: false,
                    message: "Internal server error".to_string(),
                    code: Some(code.to_string()),
                    errors: None,
                    error: detail,
                }),
            );
        }

        let message = err.to_string();
        let errors = match err {
            LedgerError::Validation(fields) => Some(fields),
            _ => None,
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                message,
                code: Some(code.to_string()),
                errors,
                error: None,
            }),
        )
    }
}
