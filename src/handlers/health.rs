use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.store.connection().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "status": "ok" })),
        ),
        Err(e) => {
            error!(error = %e, "Health check: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "status": "degraded", "message": "Database unavailable" })),
            )
        }
    }
}
