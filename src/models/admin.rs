//! Operator console request/response models (`/api/admin/*`)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{investment_snapshots, settings, users};
use crate::error::{FieldError, LedgerError};
use crate::models::common::PageQuery;
use crate::models::ledger::{InvestmentView, TransactionView, WithdrawalAction, WithdrawalView};
use crate::services::reconciler::SnapshotOverrides;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentUpdateRequest {
    pub initial_deposit: Option<Decimal>,
    pub monthly_topup: Option<Decimal>,
    pub current_profit: Option<Decimal>,
    pub target_cash: Option<Decimal>,
}

impl From<InvestmentUpdateRequest> for SnapshotOverrides {
    fn from(req: InvestmentUpdateRequest) -> Self {
        SnapshotOverrides {
            initial_deposit: req.initial_deposit,
            monthly_topup: req.monthly_topup,
            current_profit: req.current_profit,
            target_cash: req.target_cash,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTransactionRequest {
    /// Raw tag; parsed by the recorder so unknown tags surface as InvalidType
    #[serde(rename = "type", default)]
    pub transaction_type: String,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub transaction_hash: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecorded {
    pub transaction_id: i32,
    pub balance_unchanged: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveWithdrawalRequest {
    #[serde(default)]
    pub action: String,
    pub reason: Option<String>,
    pub transaction_hash: Option<String>,
}

/// Resolution input after boundary validation
#[derive(Debug, Clone)]
pub struct Resolution {
    pub action: WithdrawalAction,
    pub reason: Option<String>,
    pub transaction_hash: Option<String>,
}

impl ResolveWithdrawalRequest {
    pub fn validate(self) -> Result<Resolution, LedgerError> {
        let action = self
            .action
            .parse::<WithdrawalAction>()
            .map_err(|_| LedgerError::validation("action", "Action must be approve or reject"))?;

        let reason = self
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if action == WithdrawalAction::Reject && reason.is_none() {
            return Err(LedgerError::validation(
                "reason",
                "A reason is required to reject a withdrawal",
            ));
        }

        Ok(Resolution {
            action,
            reason,
            transaction_hash: self
                .transaction_hash
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalResolved {
    pub request_id: i32,
    pub status: String,
    pub receipt_url: Option<String>,
    pub notification_delivered: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositSlipRequest {
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub transaction_type: String,
    pub description: Option<String>,
}

impl DepositSlipRequest {
    pub fn validate(&self) -> Result<Decimal, LedgerError> {
        let mut errors = Vec::new();
        match self.amount {
            Some(a) if a > Decimal::ZERO => {}
            _ => errors.push(FieldError::new("amount", "Amount must be greater than 0")),
        }
        if !matches!(self.transaction_type.as_str(), "deposit" | "topup") {
            errors.push(FieldError::new("transactionType", "Invalid transaction type"));
        }
        match self.amount {
            Some(amount) if errors.is_empty() => Ok(amount),
            _ => Err(LedgerError::Validation(errors)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

impl UserListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawalListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
}

impl WithdrawalListQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListEntry {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub investment: Option<InvestmentView>,
}

impl UserListEntry {
    pub fn new(user: &users::Model, snapshot: Option<&investment_snapshots::Model>) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_active: user.is_active,
            created_at: user.created_at,
            investment: snapshot.map(InvestmentView::from),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_users: u64,
    pub new_users_month: u64,
    pub total_deposited: Decimal,
    pub total_balance: Decimal,
    pub total_profit: Decimal,
    pub pending_withdrawals: u64,
    pub transactions_week: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub total_users: u64,
    pub total_deposited: Decimal,
    pub total_balance: Decimal,
    pub total_profit: Decimal,
    pub pending_withdrawals_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorDashboard {
    pub stats: DashboardTotals,
    pub pending_withdrawals: Vec<WithdrawalView>,
    pub recent_transactions: Vec<TransactionView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingUpdateRequest {
    pub value: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingView {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<settings::Model> for SettingView {
    fn from(model: settings::Model) -> Self {
        Self {
            key: model.setting_key,
            value: model.setting_value,
            description: model.description,
            updated_at: model.updated_at,
        }
    }
}
