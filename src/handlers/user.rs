use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::handlers::{ensure_open, ApiError, Payload};
use crate::models::common::{ApiResponse, PageQuery, Paged};
use crate::models::ledger::{InvestmentView, TransactionView, WithdrawalView};
use crate::models::user::{
    DepositInfo, ProfileUpdateRequest, UserDashboard, UserProfile, WithdrawRequest,
    WithdrawalSubmitted,
};
use crate::services::activity_log::{self, actions, Actor};
use crate::services::identity::{RequestMeta, UserIdentity};
use crate::services::money_utils::{format_usd, to_cents};
use crate::services::settings;
use crate::services::withdrawal_workflow::WithdrawalWorkflow;
use crate::AppState;

const DASHBOARD_TRANSACTIONS: u64 = 10;

pub async fn dashboard(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
) -> Result<Json<ApiResponse<UserDashboard>>, ApiError> {
    let investment = state
        .store
        .snapshot(user.id)
        .await?
        .map(|s| InvestmentView::from(&s))
        .unwrap_or_else(InvestmentView::default_for_missing);
    let transactions = state
        .store
        .recent_transactions(user.id, DASHBOARD_TRANSACTIONS)
        .await?;

    Ok(Json(ApiResponse::ok(UserDashboard {
        user: UserProfile::from(&user),
        progress_percentage: investment.figures.progress_percentage,
        investment,
        transactions,
    })))
}

pub async fn deposit_info(
    State(state): State<AppState>,
    UserIdentity(_user): UserIdentity,
) -> Result<Json<ApiResponse<DepositInfo>>, ApiError> {
    let bitcoin_address =
        settings::wallet_address(&state.store, &state.config.bitcoin_wallet_address).await?;
    let minimum_deposit = settings::minimum_deposit(&state.store).await?;

    let instructions = vec![
        "Send Bitcoin to the address above".to_string(),
        format!("Minimum deposit amount is {}", format_usd(minimum_deposit)),
        "Deposits are credited after operator confirmation".to_string(),
        "Keep your transaction hash for reference".to_string(),
    ];

    Ok(Json(ApiResponse::ok(DepositInfo {
        bitcoin_address,
        minimum_deposit,
        instructions,
    })))
}

pub async fn withdraw(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
    meta: RequestMeta,
    Payload(request): Payload<WithdrawRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WithdrawalSubmitted>>), ApiError> {
    ensure_open(&state.store).await?;
    let request = request.validate()?;

    let workflow = WithdrawalWorkflow::new(
        &state.store,
        state.receipts.as_ref(),
        state.notifier.as_ref(),
    );
    let created = workflow.submit(user.id, request).await?;

    activity_log::record(
        &state.store,
        Actor::user(user.id),
        actions::WITHDRAWAL_REQUEST,
        format!("Withdrawal request #{} for {}", created.id, format_usd(to_cents(created.amount))),
        &meta,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            WithdrawalSubmitted {
                request_id: created.id,
                amount: to_cents(created.amount),
                withdrawal_address: created.withdrawal_address,
                status: created.status,
                submitted_at: created.requested_at,
            },
            "Withdrawal request submitted successfully",
        )),
    ))
}

pub async fn withdrawals(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
) -> Result<Json<ApiResponse<Vec<WithdrawalView>>>, ApiError> {
    let rows = state.store.user_withdrawals(user.id).await?;
    Ok(Json(ApiResponse::ok(rows)))
}

pub async fn transactions(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<TransactionView>>>, ApiError> {
    let paged = state.store.list_transactions(user.id, &page).await?;
    Ok(Json(ApiResponse::ok(paged)))
}

pub async fn profile(UserIdentity(user): UserIdentity) -> Json<ApiResponse<UserProfile>> {
    Json(ApiResponse::ok(UserProfile::from(&user)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    UserIdentity(user): UserIdentity,
    meta: RequestMeta,
    Payload(request): Payload<ProfileUpdateRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    ensure_open(&state.store).await?;
    let changes = request.validate()?;
    let updated = state.store.update_profile(user.id, changes).await?;

    activity_log::record(
        &state.store,
        Actor::user(user.id),
        actions::PROFILE_UPDATE,
        "Profile updated",
        &meta,
    )
    .await;

    Ok(Json(ApiResponse::with_message(
        UserProfile::from(&updated),
        "Profile updated successfully",
    )))
}
