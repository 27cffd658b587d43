//! Withdrawal workflow
//!
//! ```text
//! pending ──approve──▶ completed
//!    └─────reject────▶ rejected
//! ```
//!
//! Submission never touches the balance, so approval re-checks sufficiency
//! against the balance at resolution time. Approval locks the request and
//! the snapshot, debits the snapshot, appends the `withdrawal` transaction
//! and closes the request in one database transaction. The receipt is
//! rendered before that transaction and discarded again if the transaction
//! fails, e.g. when a concurrent resolution wins the row lock. The
//! notification is sent after commit and cannot roll the approval back.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tracing::{info, warn};

use crate::entities::{investment_snapshots, transactions, users, withdrawal_requests};
use crate::error::LedgerError;
use crate::models::admin::Resolution;
use crate::models::ledger::{TransactionStatus, TransactionType, WithdrawalAction, WithdrawalStatus};
use crate::models::user::NewWithdrawal;
use crate::services::ledger_store::{
    insert_transaction, lock_snapshot, lock_withdrawal, write_snapshot, LedgerStore, NewTransaction,
};
use crate::services::money_utils::{format_usd, to_cents, validate_positive_amount};
use crate::services::notifier::{render_withdrawal_receipt, NotificationSink};
use crate::services::receipts::{ReceiptData, ReceiptRenderer};
use crate::services::reconciler::{self, SnapshotFigures};
use crate::services::settings;

/// Result of resolving a request
#[derive(Debug, Clone)]
pub struct WithdrawalOutcome {
    pub request: withdrawal_requests::Model,
    pub transaction: Option<transactions::Model>,
    pub snapshot: Option<investment_snapshots::Model>,
    pub receipt_url: Option<String>,
    /// False when the sink refused or was not reached; the resolution stands
    pub notification_delivered: bool,
}

pub struct WithdrawalWorkflow<'a> {
    store: &'a LedgerStore,
    receipts: &'a dyn ReceiptRenderer,
    notifier: &'a dyn NotificationSink,
}

impl<'a> WithdrawalWorkflow<'a> {
    pub fn new(
        store: &'a LedgerStore,
        receipts: &'a dyn ReceiptRenderer,
        notifier: &'a dyn NotificationSink,
    ) -> Self {
        Self {
            store,
            receipts,
            notifier,
        }
    }

    /// Create a pending request. Nothing is persisted when a check fails.
    pub async fn submit(
        &self,
        user_id: i32,
        request: NewWithdrawal,
    ) -> Result<withdrawal_requests::Model, LedgerError> {
        let amount = validate_positive_amount(request.amount)?;
        let minimum = settings::minimum_withdrawal(self.store).await?;
        if amount < minimum {
            return Err(LedgerError::validation(
                "amount",
                format!("Minimum withdrawal amount is {}", format_usd(minimum)),
            ));
        }

        self.store.require_user(user_id).await?;
        let balance = self.current_balance(user_id).await?;
        if amount > balance {
            info!(user_id, amount = %amount, balance = %balance, "Withdrawal refused: insufficient balance");
            return Err(LedgerError::InsufficientBalance);
        }

        let created = self
            .store
            .create_withdrawal(user_id, &NewWithdrawal { amount, ..request })
            .await?;
        info!(withdrawal_id = created.id, user_id, amount = %amount, "Withdrawal request submitted");
        Ok(created)
    }

    pub async fn resolve(
        &self,
        request_id: i32,
        operator_id: i32,
        resolution: Resolution,
    ) -> Result<WithdrawalOutcome, LedgerError> {
        match resolution.action {
            WithdrawalAction::Approve => {
                self.approve(request_id, operator_id, resolution.transaction_hash)
                    .await
            }
            WithdrawalAction::Reject => {
                let reason = resolution.reason.unwrap_or_default();
                self.reject(request_id, operator_id, &reason).await
            }
        }
    }

    pub async fn approve(
        &self,
        request_id: i32,
        operator_id: i32,
        transaction_hash: Option<String>,
    ) -> Result<WithdrawalOutcome, LedgerError> {
        // Cheap checks first so a doomed approval does not render a receipt
        let request = self.pending_request(request_id).await?;
        let user = self.store.require_user(request.user_id).await?;
        let amount = to_cents(request.amount);
        if amount > self.current_balance(user.id).await? {
            return Err(LedgerError::InsufficientBalance);
        }

        let receipt_url = self
            .receipts
            .render(&ReceiptData {
                withdrawal_id: request.id,
                user_name: user.full_name(),
                user_email: user.email.clone(),
                amount,
                withdrawal_address: request.withdrawal_address.clone(),
                transaction_hash: transaction_hash.clone(),
                issued_at: Utc::now(),
            })
            .await;
        if receipt_url.is_none() {
            warn!(withdrawal_id = request.id, "Approving without a receipt");
        }

        let committed = self
            .commit_approval(request_id, operator_id, amount, transaction_hash, receipt_url.clone())
            .await;
        let (request, transaction, snapshot) = match committed {
            Ok(rows) => rows,
            Err(e) => {
                // Lost a race or failed to commit; the receipt references nothing
                if let Some(url) = receipt_url.as_deref() {
                    self.receipts.discard(url).await;
                }
                return Err(e);
            }
        };

        info!(
            withdrawal_id = request.id,
            user_id = request.user_id,
            operator_id,
            amount = %amount,
            balance = %snapshot.current_balance,
            "Withdrawal approved"
        );

        let notification_delivered = self.notify_receipt(&user, &request, receipt_url.as_deref()).await;

        Ok(WithdrawalOutcome {
            request,
            transaction: Some(transaction),
            snapshot: Some(snapshot),
            receipt_url,
            notification_delivered,
        })
    }

    /// Lock, debit, append and close the request in one transaction
    async fn commit_approval(
        &self,
        request_id: i32,
        operator_id: i32,
        amount: Decimal,
        transaction_hash: Option<String>,
        receipt_url: Option<String>,
    ) -> Result<
        (
            withdrawal_requests::Model,
            transactions::Model,
            investment_snapshots::Model,
        ),
        LedgerError,
    > {
        let txn = self.store.begin().await?;

        let locked = lock_withdrawal(&txn, request_id)
            .await?
            .ok_or(LedgerError::NotFound("Withdrawal request"))?;
        ensure_pending(&locked)?;

        let current = lock_snapshot(&txn, locked.user_id)
            .await?
            .ok_or(LedgerError::InsufficientBalance)?;
        let debited = reconciler::apply_withdrawal(&SnapshotFigures::from(&current), amount)?;
        let snapshot = write_snapshot(&txn, locked.user_id, Some(current), &debited).await?;

        let transaction = insert_transaction(
            &txn,
            NewTransaction {
                user_id: locked.user_id,
                transaction_type: TransactionType::Withdrawal,
                amount,
                status: TransactionStatus::Confirmed,
                description: Some(format!("Withdrawal to {}", locked.withdrawal_address)),
                transaction_hash,
                receipt_ref: receipt_url.clone(),
                processed_by: Some(operator_id),
            },
        )
        .await?;

        let mut active: withdrawal_requests::ActiveModel = locked.into();
        active.status = Set(WithdrawalStatus::Completed.to_string());
        active.receipt_ref = Set(receipt_url);
        active.processed_by = Set(Some(operator_id));
        active.processed_at = Set(Some(Utc::now()));
        let request = active.update(&txn).await?;

        txn.commit().await?;
        Ok((request, transaction, snapshot))
    }

    pub async fn reject(
        &self,
        request_id: i32,
        operator_id: i32,
        reason: &str,
    ) -> Result<WithdrawalOutcome, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::validation(
                "reason",
                "A reason is required to reject a withdrawal",
            ));
        }

        let txn = self.store.begin().await?;
        let locked = lock_withdrawal(&txn, request_id)
            .await?
            .ok_or(LedgerError::NotFound("Withdrawal request"))?;
        ensure_pending(&locked)?;

        let mut active: withdrawal_requests::ActiveModel = locked.into();
        active.status = Set(WithdrawalStatus::Rejected.to_string());
        active.reason = Set(Some(reason.to_string()));
        active.processed_by = Set(Some(operator_id));
        active.processed_at = Set(Some(Utc::now()));
        let request = active.update(&txn).await?;
        txn.commit().await?;

        info!(withdrawal_id = request.id, user_id = request.user_id, operator_id, "Withdrawal rejected");

        Ok(WithdrawalOutcome {
            request,
            transaction: None,
            snapshot: None,
            receipt_url: None,
            notification_delivered: false,
        })
    }

    async fn pending_request(&self, request_id: i32) -> Result<withdrawal_requests::Model, LedgerError> {
        let request = self
            .store
            .find_withdrawal(request_id)
            .await?
            .ok_or(LedgerError::NotFound("Withdrawal request"))?;
        ensure_pending(&request)?;
        Ok(request)
    }

    async fn current_balance(&self, user_id: i32) -> Result<Decimal, LedgerError> {
        Ok(self
            .store
            .snapshot(user_id)
            .await?
            .map(|s| to_cents(s.current_balance))
            .unwrap_or(Decimal::ZERO))
    }

    async fn notify_receipt(
        &self,
        user: &users::Model,
        request: &withdrawal_requests::Model,
        receipt_url: Option<&str>,
    ) -> bool {
        let notification = render_withdrawal_receipt(user, request, receipt_url);
        let delivered = self.notifier.notify(user, &notification).await;
        if !delivered {
            warn!(withdrawal_id = request.id, "Withdrawal receipt notification not delivered");
        }
        delivered
    }
}

fn ensure_pending(request: &withdrawal_requests::Model) -> Result<(), LedgerError> {
    match request.status.parse::<WithdrawalStatus>() {
        Ok(WithdrawalStatus::Pending) => Ok(()),
        Ok(_) => Err(LedgerError::AlreadyProcessed),
        Err(msg) => Err(LedgerError::Internal(msg)),
    }
}
