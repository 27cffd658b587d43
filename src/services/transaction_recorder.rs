//! Transaction recorder
//!
//! Appends operator bookkeeping entries to a user's ledger. Recording a
//! deposit, top-up or profit here does not move the snapshot balance; the
//! operator adjusts the snapshot separately through the investment update.
//! Withdrawals only change the balance through the withdrawal workflow.

use rust_decimal::Decimal;
use tracing::info;

use crate::entities::transactions;
use crate::error::LedgerError;
use crate::models::ledger::{TransactionStatus, TransactionType};
use crate::services::ledger_store::{LedgerStore, NewTransaction};
use crate::services::money_utils::validate_positive_amount;

/// Raw recording request; tags are parsed here so callers get typed errors
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub user_id: i32,
    pub transaction_type: String,
    pub amount: Decimal,
    pub description: Option<String>,
    pub transaction_hash: Option<String>,
    pub operator_id: Option<i32>,
    pub status: Option<String>,
}

pub struct TransactionRecorder<'a> {
    store: &'a LedgerStore,
}

impl<'a> TransactionRecorder<'a> {
    pub fn new(store: &'a LedgerStore) -> Self {
        Self { store }
    }

    pub async fn record(&self, request: RecordRequest) -> Result<transactions::Model, LedgerError> {
        let amount = validate_positive_amount(request.amount)?;
        let kind = request
            .transaction_type
            .parse::<TransactionType>()
            .map_err(|_| LedgerError::InvalidType(request.transaction_type.clone()))?;
        let status = resolve_status(request.status.as_deref(), request.operator_id)?;

        self.store.require_user(request.user_id).await?;

        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .or_else(|| {
                request
                    .operator_id
                    .map(|_| format!("Operator recorded {}", kind))
            });

        let recorded = self
            .store
            .append_transaction(NewTransaction {
                user_id: request.user_id,
                transaction_type: kind,
                amount,
                status,
                description,
                transaction_hash: request
                    .transaction_hash
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty()),
                receipt_ref: None,
                processed_by: request.operator_id,
            })
            .await?;

        info!(
            transaction_id = recorded.id,
            user_id = recorded.user_id,
            operator_id = ?recorded.processed_by,
            kind = %kind,
            amount = %amount,
            "Transaction recorded"
        );
        Ok(recorded)
    }
}

/// Explicit status wins; otherwise operator entries are `confirmed` and
/// anything else starts `pending`.
fn resolve_status(
    explicit: Option<&str>,
    operator_id: Option<i32>,
) -> Result<TransactionStatus, LedgerError> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<TransactionStatus>()
            .map_err(|msg| LedgerError::validation("status", msg)),
        None if operator_id.is_some() => Ok(TransactionStatus::Confirmed),
        None => Ok(TransactionStatus::Pending),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_entries_default_to_confirmed() {
        assert_eq!(
            resolve_status(None, Some(1)).unwrap(),
            TransactionStatus::Confirmed
        );
        assert_eq!(resolve_status(None, None).unwrap(), TransactionStatus::Pending);
    }

    #[test]
    fn test_explicit_status_is_honoured() {
        assert_eq!(
            resolve_status(Some("failed"), Some(1)).unwrap(),
            TransactionStatus::Failed
        );
        assert!(resolve_status(Some("settled"), Some(1)).is_err());
    }
}
