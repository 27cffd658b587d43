pub mod admin;
pub mod auth;
pub mod health;
pub mod user;

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::LedgerError;
use crate::models::common::ErrorResponse;
use crate::services::ledger_store::LedgerStore;
use crate::services::settings;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// JSON body whose rejection is reported in the ledger's error shape
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(rejection) => Err(LedgerError::validation("body", rejection.body_text()).into()),
        }
    }
}

/// Refuse user-side mutations while `app_maintenance` is on
pub(crate) async fn ensure_open(store: &LedgerStore) -> Result<(), LedgerError> {
    if settings::maintenance_enabled(store).await? {
        return Err(LedgerError::Maintenance);
    }
    Ok(())
}

/// 502 for a notification the sink did not accept
pub(crate) fn delivery_failed(message: &str) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            success: false,
            message: message.to_string(),
            code: Some("DELIVERY_FAILED".to_string()),
            errors: None,
            error: None,
        }),
    )
}
