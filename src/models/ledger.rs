//! Ledger vocabulary (transaction types, statuses, withdrawal actions) and
//! the read views returned by the API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{activity_logs, investment_snapshots, transactions, users, withdrawal_requests};
use crate::services::money_utils::to_cents;
use crate::services::reconciler::SnapshotFigures;

/// Transaction types recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Profit,
    Topup,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Deposit => write!(f, "deposit"),
            TransactionType::Withdrawal => write!(f, "withdrawal"),
            TransactionType::Profit => write!(f, "profit"),
            TransactionType::Topup => write!(f, "topup"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "profit" => Ok(TransactionType::Profit),
            "topup" => Ok(TransactionType::Topup),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

/// Transaction status. `confirmed` means recorded, not externally settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Confirmed => write!(f, "confirmed"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "confirmed" => Ok(TransactionStatus::Confirmed),
            "failed" => Ok(TransactionStatus::Failed),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

/// Withdrawal request states
/// pending → completed
///         ↘ rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Completed => write!(f, "completed"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(WithdrawalStatus::Pending),
            "completed" => Ok(WithdrawalStatus::Completed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            _ => Err(format!("Unknown withdrawal status: {}", s)),
        }
    }
}

/// Operator decision on a pending withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalAction {
    Approve,
    Reject,
}

impl WithdrawalAction {
    /// Status the request lands in
    pub fn target_status(&self) -> WithdrawalStatus {
        match self {
            WithdrawalAction::Approve => WithdrawalStatus::Completed,
            WithdrawalAction::Reject => WithdrawalStatus::Rejected,
        }
    }

    /// Past tense, for messages
    pub fn past_tense(&self) -> &'static str {
        match self {
            WithdrawalAction::Approve => "approved",
            WithdrawalAction::Reject => "rejected",
        }
    }
}

impl std::fmt::Display for WithdrawalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WithdrawalAction::Approve => write!(f, "approve"),
            WithdrawalAction::Reject => write!(f, "reject"),
        }
    }
}

impl std::str::FromStr for WithdrawalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(WithdrawalAction::Approve),
            "reject" => Ok(WithdrawalAction::Reject),
            _ => Err(format!("Action must be approve or reject, got: {}", s)),
        }
    }
}

/// Name and email of the user a row belongs to (operator views only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&users::Model> for UserRef {
    fn from(user: &users::Model) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Snapshot as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentView {
    #[serde(flatten)]
    pub figures: SnapshotFigures,
    pub investment_start_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl InvestmentView {
    /// Documented default for a user with no snapshot row
    pub fn default_for_missing() -> Self {
        Self {
            figures: SnapshotFigures::default(),
            investment_start_date: None,
            last_updated: None,
        }
    }
}

impl From<&investment_snapshots::Model> for InvestmentView {
    fn from(model: &investment_snapshots::Model) -> Self {
        Self {
            figures: SnapshotFigures::from(model),
            investment_start_date: Some(model.investment_start_date),
            last_updated: Some(model.last_updated),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: Decimal,
    pub transaction_hash: Option<String>,
    pub status: String,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub processed_by: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<transactions::Model> for TransactionView {
    fn from(model: transactions::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            transaction_type: model.transaction_type,
            amount: to_cents(model.amount),
            transaction_hash: model.transaction_hash,
            status: model.status,
            description: model.description,
            receipt_url: model.receipt_ref,
            processed_by: model.processed_by,
            processed_by_username: None,
            user: None,
            created_at: model.created_at,
            processed_at: model.processed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalView {
    pub id: i32,
    pub user_id: i32,
    pub amount: Decimal,
    pub withdrawal_address: String,
    pub status: String,
    pub reason: Option<String>,
    pub receipt_url: Option<String>,
    pub processed_by: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<withdrawal_requests::Model> for WithdrawalView {
    fn from(model: withdrawal_requests::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            amount: to_cents(model.amount),
            withdrawal_address: model.withdrawal_address,
            status: model.status,
            reason: model.reason,
            receipt_url: model.receipt_ref,
            processed_by: model.processed_by,
            processed_by_username: None,
            user: None,
            requested_at: model.requested_at,
            processed_at: model.processed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub id: i32,
    pub user_id: Option<i32>,
    pub operator_id: Option<i32>,
    pub action: String,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<activity_logs::Model> for ActivityView {
    fn from(model: activity_logs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            operator_id: model.operator_id,
            action: model.action,
            description: model.description,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at,
        }
    }
}
