use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::error::LedgerError;
use crate::handlers::{delivery_failed, ApiError, Payload};
use crate::models::admin::{
    AddTransactionRequest, DashboardTotals, DepositSlipRequest, InvestmentUpdateRequest,
    LedgerStats, OperatorDashboard, ResolveWithdrawalRequest, SettingUpdateRequest, SettingView,
    TransactionRecorded, UserListEntry, UserListQuery, WithdrawalListQuery, WithdrawalResolved,
};
use crate::models::common::{ApiResponse, PageQuery, Paged};
use crate::models::ledger::{
    ActivityView, InvestmentView, TransactionType, WithdrawalAction, WithdrawalStatus,
    WithdrawalView,
};
use crate::services::activity_log::{self, actions, Actor};
use crate::services::identity::{OperatorIdentity, RequestMeta};
use crate::services::money_utils::{format_usd, to_cents};
use crate::services::notifier::{render_deposit_slip, render_summary};
use crate::services::reconciler::{self, SnapshotFigures, SnapshotOverrides};
use crate::services::settings;
use crate::services::transaction_recorder::{RecordRequest, TransactionRecorder};
use crate::services::withdrawal_workflow::WithdrawalWorkflow;
use crate::AppState;

const DASHBOARD_TRANSACTIONS: u64 = 10;
const SUMMARY_TRANSACTIONS: u64 = 5;

pub async fn dashboard(
    State(state): State<AppState>,
    OperatorIdentity(_operator): OperatorIdentity,
) -> Result<Json<ApiResponse<OperatorDashboard>>, ApiError> {
    let stats = state.store.stats().await?;
    let pending_withdrawals = state.store.pending_withdrawals().await?;
    let recent_transactions = state
        .store
        .recent_transactions_all(DASHBOARD_TRANSACTIONS)
        .await?;

    Ok(Json(ApiResponse::ok(OperatorDashboard {
        stats: DashboardTotals {
            total_users: stats.total_users,
            total_deposited: stats.total_deposited,
            total_balance: stats.total_balance,
            total_profit: stats.total_profit,
            pending_withdrawals_count: stats.pending_withdrawals,
        },
        pending_withdrawals,
        recent_transactions,
    })))
}

pub async fn stats(
    State(state): State<AppState>,
    OperatorIdentity(_operator): OperatorIdentity,
) -> Result<Json<ApiResponse<LedgerStats>>, ApiError> {
    Ok(Json(ApiResponse::ok(state.store.stats().await?)))
}

pub async fn list_users(
    State(state): State<AppState>,
    OperatorIdentity(_operator): OperatorIdentity,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Paged<UserListEntry>>>, ApiError> {
    let paged = state
        .store
        .list_users(query.search_term(), &query.page_query())
        .await?;
    Ok(Json(ApiResponse::ok(paged)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    OperatorIdentity(operator): OperatorIdentity,
    meta: RequestMeta,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let removed = state.store.delete_user(user_id).await?;

    activity_log::record(
        &state.store,
        Actor::operator(operator.id, None),
        actions::USER_DELETED,
        format!("Deleted user #{} ({})", removed.id, removed.email),
        &meta,
    )
    .await;

    Ok(Json(ApiResponse::message("User deleted successfully")))
}

pub async fn update_investment(
    State(state): State<AppState>,
    OperatorIdentity(operator): OperatorIdentity,
    meta: RequestMeta,
    Path(user_id): Path<i32>,
    Payload(request): Payload<InvestmentUpdateRequest>,
) -> Result<Json<ApiResponse<InvestmentView>>, ApiError> {
    let overrides = SnapshotOverrides::from(request);
    if overrides.is_empty() {
        return Err(LedgerError::validation(
            "investment",
            "At least one investment field must be provided",
        )
        .into());
    }

    let snapshot = state.store.update_snapshot(user_id, &overrides).await?;
    let view = InvestmentView::from(&snapshot);

    activity_log::record(
        &state.store,
        Actor::operator(operator.id, Some(user_id)),
        actions::INVESTMENT_UPDATE,
        format!(
            "Investment updated: balance {}, progress {}%",
            format_usd(view.figures.current_balance),
            view.figures.progress_percentage
        ),
        &meta,
    )
    .await;

    Ok(Json(ApiResponse::with_message(
        view,
        "Investment updated successfully",
    )))
}

pub async fn add_transaction(
    State(state): State<AppState>,
    OperatorIdentity(operator): OperatorIdentity,
    meta: RequestMeta,
    Path(user_id): Path<i32>,
    Payload(request): Payload<AddTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransactionRecorded>>), ApiError> {
    let amount = request
        .amount
        .ok_or_else(|| LedgerError::validation("amount", "Amount is required"))?;

    let recorded = TransactionRecorder::new(&state.store)
        .record(RecordRequest {
            user_id,
            transaction_type: request.transaction_type,
            amount,
            description: request.description,
            transaction_hash: request.transaction_hash,
            operator_id: Some(operator.id),
            status: request.status,
        })
        .await?;

    activity_log::record(
        &state.store,
        Actor::operator(operator.id, Some(user_id)),
        actions::TRANSACTION_ADDED,
        format!(
            "Recorded {} of {}",
            recorded.transaction_type,
            format_usd(to_cents(recorded.amount))
        ),
        &meta,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            TransactionRecorded {
                transaction_id: recorded.id,
                balance_unchanged: true,
            },
            "Transaction recorded. The investment balance is not changed by this entry; \
             update the investment figures if it should be.",
        )),
    ))
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    OperatorIdentity(_operator): OperatorIdentity,
    Query(query): Query<WithdrawalListQuery>,
) -> Result<Json<ApiResponse<Paged<WithdrawalView>>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None | Some("all") => None,
        Some(raw) => Some(
            raw.parse::<WithdrawalStatus>()
                .map_err(|e| LedgerError::validation("status", e))?,
        ),
    };
    let paged = state
        .store
        .list_withdrawals(status, &query.page_query())
        .await?;
    Ok(Json(ApiResponse::ok(paged)))
}

pub async fn resolve_withdrawal(
    State(state): State<AppState>,
    OperatorIdentity(operator): OperatorIdentity,
    meta: RequestMeta,
    Path(request_id): Path<i32>,
    Payload(request): Payload<ResolveWithdrawalRequest>,
) -> Result<Json<ApiResponse<WithdrawalResolved>>, ApiError> {
    let resolution = request.validate()?;
    let action = resolution.action;

    let workflow = WithdrawalWorkflow::new(
        &state.store,
        state.receipts.as_ref(),
        state.notifier.as_ref(),
    );
    let outcome = workflow.resolve(request_id, operator.id, resolution).await?;

    let (log_action, description) = match action {
        WithdrawalAction::Approve => (
            actions::WITHDRAWAL_APPROVE,
            format!("Approved withdrawal #{}", outcome.request.id),
        ),
        WithdrawalAction::Reject => (
            actions::WITHDRAWAL_REJECT,
            format!(
                "Rejected withdrawal #{}: {}",
                outcome.request.id,
                outcome.request.reason.as_deref().unwrap_or_default()
            ),
        ),
    };
    activity_log::record(
        &state.store,
        Actor::operator(operator.id, Some(outcome.request.user_id)),
        log_action,
        description,
        &meta,
    )
    .await;

    let mut message = format!("Withdrawal {} successfully", action.past_tense());
    if action == WithdrawalAction::Approve && !outcome.notification_delivered {
        message.push_str("; the receipt notification could not be delivered");
    }

    Ok(Json(ApiResponse::with_message(
        WithdrawalResolved {
            request_id: outcome.request.id,
            status: outcome.request.status,
            receipt_url: outcome.receipt_url,
            notification_delivered: outcome.notification_delivered,
        },
        message,
    )))
}

pub async fn send_deposit_slip(
    State(state): State<AppState>,
    OperatorIdentity(operator): OperatorIdentity,
    meta: RequestMeta,
    Path(user_id): Path<i32>,
    Payload(request): Payload<DepositSlipRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let amount = request.validate()?;
    let kind = request
        .transaction_type
        .parse::<TransactionType>()
        .map_err(|_| LedgerError::InvalidType(request.transaction_type.clone()))?;

    let user = state.store.require_user(user_id).await?;
    let before = state
        .store
        .snapshot(user_id)
        .await?
        .map(|s| SnapshotFigures::from(&s))
        .unwrap_or_default();
    let after = reconciler::project_deposit(Some(&before), kind, amount)?;

    let slip = render_deposit_slip(
        &user,
        kind,
        amount,
        &before,
        &after,
        request.description.as_deref(),
    );
    if !state.notifier.notify(&user, &slip).await {
        return Err(delivery_failed("Failed to send deposit slip"));
    }

    activity_log::record(
        &state.store,
        Actor::operator(operator.id, Some(user_id)),
        actions::DEPOSIT_SLIP_SENT,
        format!("Sent {} slip for {}", kind, format_usd(amount)),
        &meta,
    )
    .await;
    info!(user_id, operator_id = operator.id, "Deposit slip sent");

    Ok(Json(ApiResponse::message(format!(
        "Deposit slip sent to {}",
        user.email
    ))))
}

pub async fn send_summary(
    State(state): State<AppState>,
    OperatorIdentity(operator): OperatorIdentity,
    meta: RequestMeta,
    Path(user_id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let user = state.store.require_user(user_id).await?;
    let figures = state
        .store
        .snapshot(user_id)
        .await?
        .map(|s| SnapshotFigures::from(&s))
        .unwrap_or_default();
    let recent = state
        .store
        .recent_transactions(user_id, SUMMARY_TRANSACTIONS)
        .await?;

    let summary = render_summary(&user, &figures, &recent);
    if !state.notifier.notify(&user, &summary).await {
        return Err(delivery_failed("Failed to send investment summary"));
    }

    activity_log::record(
        &state.store,
        Actor::operator(operator.id, Some(user_id)),
        actions::SUMMARY_SENT,
        "Sent investment summary",
        &meta,
    )
    .await;

    Ok(Json(ApiResponse::message(format!(
        "Investment summary sent to {}",
        user.email
    ))))
}

pub async fn list_settings(
    State(state): State<AppState>,
    OperatorIdentity(_operator): OperatorIdentity,
) -> Result<Json<ApiResponse<Vec<SettingView>>>, ApiError> {
    let rows = state.store.all_settings().await?;
    Ok(Json(ApiResponse::ok(
        rows.into_iter().map(SettingView::from).collect(),
    )))
}

pub async fn update_setting(
    State(state): State<AppState>,
    OperatorIdentity(operator): OperatorIdentity,
    meta: RequestMeta,
    Path(key): Path<String>,
    Payload(request): Payload<SettingUpdateRequest>,
) -> Result<Json<ApiResponse<SettingView>>, ApiError> {
    let key = key.trim().to_string();
    let value = request
        .value
        .map(|v| v.trim().to_string())
        .ok_or_else(|| LedgerError::validation("value", "Setting value is required"))?;
    settings::validate_value(&key, &value)?;

    let saved = state
        .store
        .upsert_setting(&key, &value, request.description.as_deref())
        .await?;

    activity_log::record(
        &state.store,
        Actor::operator(operator.id, None),
        actions::SETTING_UPDATE,
        format!("Setting {} set to '{}'", key, value),
        &meta,
    )
    .await;

    Ok(Json(ApiResponse::with_message(
        SettingView::from(saved),
        "Setting updated successfully",
    )))
}

pub async fn list_activity(
    State(state): State<AppState>,
    OperatorIdentity(_operator): OperatorIdentity,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Paged<ActivityView>>>, ApiError> {
    let paged = state.store.list_activity(&page).await?;
    Ok(Json(ApiResponse::ok(paged)))
}
