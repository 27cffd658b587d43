//! End-user request/response models (`/api/user/*`)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::users;
use crate::error::{FieldError, LedgerError};
use crate::models::auth::check_name;
use crate::models::ledger::{InvestmentView, TransactionView};

const MAX_ADDRESS_LENGTH: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub member_since: DateTime<Utc>,
}

impl From<&users::Model> for UserProfile {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            member_since: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDashboard {
    pub user: UserProfile,
    pub investment: InvestmentView,
    pub transactions: Vec<TransactionView>,
    pub progress_percentage: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositInfo {
    pub bitcoin_address: String,
    pub minimum_deposit: Decimal,
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub withdrawal_address: String,
    pub reason: Option<String>,
}

/// Withdrawal submission after boundary validation
#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub amount: Decimal,
    pub withdrawal_address: String,
    pub reason: String,
}

impl WithdrawRequest {
    /// Shape checks only; the minimum and balance rules live in the workflow
    pub fn validate(self) -> Result<NewWithdrawal, LedgerError> {
        let mut errors = Vec::new();
        if self.amount.is_none() {
            errors.push(FieldError::new("amount", "Amount is required"));
        }
        let address = self.withdrawal_address.trim().to_string();
        if address.is_empty() {
            errors.push(FieldError::new(
                "withdrawalAddress",
                "Withdrawal address is required",
            ));
        }

        match self.amount {
            Some(amount) if errors.is_empty() => Ok(NewWithdrawal {
                amount,
                withdrawal_address: address,
                reason: self
                    .reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| "User withdrawal request".to_string()),
            }),
            _ => Err(LedgerError::Validation(errors)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSubmitted {
    pub request_id: i32,
    pub amount: Decimal,
    pub withdrawal_address: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Profile fields to overwrite; `None` keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ProfileUpdateRequest {
    pub fn validate(self) -> Result<ProfileChanges, LedgerError> {
        let mut errors = Vec::new();
        if let Some(first) = &self.first_name {
            check_name("firstName", "First name", first, &mut errors);
        }
        if let Some(last) = &self.last_name {
            check_name("lastName", "Last name", last, &mut errors);
        }
        if let Some(address) = &self.address {
            if address.chars().count() > MAX_ADDRESS_LENGTH {
                errors.push(FieldError::new(
                    "address",
                    format!("Address cannot exceed {} characters", MAX_ADDRESS_LENGTH),
                ));
            }
        }
        if !errors.is_empty() {
            return Err(LedgerError::Validation(errors));
        }

        let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string());
        Ok(ProfileChanges {
            first_name: trimmed(self.first_name),
            last_name: trimmed(self.last_name),
            phone: trimmed(self.phone),
            address: trimmed(self.address),
        })
    }
}
