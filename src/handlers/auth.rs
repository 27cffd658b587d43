use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::error::LedgerError;
use crate::handlers::{ensure_open, ApiError, Payload};
use crate::models::auth::{
    LoginRequest, OperatorAuthResponse, OperatorLoginRequest, OperatorSummary, RegisterRequest,
    Role, UserAuthResponse, UserSummary, VerifiedSubject, VerifyResponse,
};
use crate::models::common::ApiResponse;
use crate::services::activity_log::{self, actions, Actor};
use crate::services::identity::{
    authenticate_operator, authenticate_user, hash_password_async, RequestMeta, VerifiedClaims,
};
use crate::services::ledger_store::NewUserRecord;
use crate::services::settings;
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    meta: RequestMeta,
    Payload(request): Payload<RegisterRequest>,
) -> Result<(StatusCode, Json<UserAuthResponse>), ApiError> {
    ensure_open(&state.store).await?;
    if !settings::registration_enabled(&state.store).await? {
        return Err(LedgerError::Forbidden("Registration is currently disabled".to_string()).into());
    }

    let new_user = request.validate()?;
    let password_hash = hash_password_async(new_user.password).await?;
    let user = state
        .store
        .create_user(NewUserRecord {
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash,
        })
        .await?;

    activity_log::record(
        &state.store,
        Actor::user(user.id),
        actions::USER_REGISTRATION,
        format!("User registered: {}", user.email),
        &meta,
    )
    .await;

    let token = state.identity.issue(user.id, Role::User)?;
    Ok((
        StatusCode::CREATED,
        Json(UserAuthResponse {
            success: true,
            message: "Registration successful".to_string(),
            token,
            user: UserSummary::from(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    meta: RequestMeta,
    Payload(request): Payload<LoginRequest>,
) -> Result<Json<UserAuthResponse>, ApiError> {
    let email = request.validate()?;
    let user = authenticate_user(&state.store, &email, &request.password).await?;

    activity_log::record(
        &state.store,
        Actor::user(user.id),
        actions::USER_LOGIN,
        "User logged in",
        &meta,
    )
    .await;

    let token = state.identity.issue(user.id, Role::User)?;
    Ok(Json(UserAuthResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserSummary::from(&user),
    }))
}

/// Mounted at both `/api/auth/admin-login` and `/api/auth/admin/login`
pub async fn operator_login(
    State(state): State<AppState>,
    meta: RequestMeta,
    Payload(request): Payload<OperatorLoginRequest>,
) -> Result<Json<OperatorAuthResponse>, ApiError> {
    request.validate()?;
    let operator = authenticate_operator(&state.store, &request.username, &request.password).await?;

    activity_log::record(
        &state.store,
        Actor::operator(operator.id, None),
        actions::ADMIN_LOGIN,
        format!("Operator logged in: {}", operator.username),
        &meta,
    )
    .await;
    info!(operator_id = operator.id, "Operator login");

    let token = state.identity.issue(operator.id, Role::Operator)?;
    Ok(Json(OperatorAuthResponse {
        success: true,
        message: "Admin login successful".to_string(),
        token,
        admin: OperatorSummary::from(&operator),
    }))
}

pub async fn verify(VerifiedClaims(claims): VerifiedClaims) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        success: true,
        message: "Token is valid".to_string(),
        subject: VerifiedSubject {
            subject_id: claims.sub,
            role: claims.role,
            expires_at: claims.exp,
        },
    })
}

/// Assertions are stateless; the client discards its token
pub async fn logout() -> Json<ApiResponse<()>> {
    Json(ApiResponse::message("Logged out successfully"))
}
