mod common;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use mpi_ledger_backend::error::LedgerError;
use mpi_ledger_backend::models::admin::Resolution;
use mpi_ledger_backend::models::common::PageQuery;
use mpi_ledger_backend::models::ledger::{TransactionType, WithdrawalAction, WithdrawalStatus};
use mpi_ledger_backend::models::user::NewWithdrawal;
use mpi_ledger_backend::services::identity::{authenticate_operator, authenticate_user};
use mpi_ledger_backend::services::ledger_store::{LedgerStore, NewUserRecord};
use mpi_ledger_backend::services::money_utils::to_cents;
use mpi_ledger_backend::services::notifier::NotificationKind;
use mpi_ledger_backend::services::receipts::{FileReceiptRenderer, ReceiptData, ReceiptRenderer};
use mpi_ledger_backend::services::reconciler::SnapshotOverrides;
use mpi_ledger_backend::services::transaction_recorder::{RecordRequest, TransactionRecorder};
use mpi_ledger_backend::services::withdrawal_workflow::WithdrawalWorkflow;

use crate::common::{
    create_operator, create_user_with_balance, setup_store, BrokenReceipts, FixedReceipts,
    RecordingNotifier, TEST_PASSWORD,
};

fn withdrawal(amount: rust_decimal::Decimal) -> NewWithdrawal {
    NewWithdrawal {
        amount,
        withdrawal_address: "bc1qdestination".to_string(),
        reason: "User withdrawal request".to_string(),
    }
}

#[tokio::test]
async fn test_registration_creates_default_snapshot() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "fresh@example.com", dec!(0)).await;

    let snapshot = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(snapshot.target_cash), dec!(500000.00));
    assert_eq!(to_cents(snapshot.current_balance), dec!(0.00));
    assert_eq!(to_cents(snapshot.progress_percentage), dec!(0.00));
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_without_second_row() {
    let store = setup_store().await;
    create_user_with_balance(&store, "dup@example.com", dec!(0)).await;

    let second = store
        .create_user(NewUserRecord {
            first_name: "Other".to_string(),
            last_name: "Person".to_string(),
            email: "dup@example.com".to_string(),
            password_hash: "x".to_string(),
        })
        .await;
    assert!(matches!(second, Err(LedgerError::DuplicateEmail)));

    let page = store.list_users(Some("dup@"), &Default::default()).await.unwrap();
    assert_eq!(page.pagination.total, 1);
}

#[tokio::test]
async fn test_update_snapshot_reconciles_scenario() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "scenario@example.com", dec!(0)).await;

    let updated = store
        .update_snapshot(
            user.id,
            &SnapshotOverrides {
                initial_deposit: Some(dec!(10000)),
                monthly_topup: Some(dec!(1500)),
                current_profit: Some(dec!(2340)),
                target_cash: Some(dec!(500000)),
            },
        )
        .await
        .unwrap();

    assert_eq!(to_cents(updated.total_deposited), dec!(11500.00));
    assert_eq!(to_cents(updated.current_balance), dec!(13840.00));
    assert_eq!(to_cents(updated.progress_percentage), dec!(2.77));

    // Partial override keeps the other fields
    let partial = store
        .update_snapshot(
            user.id,
            &SnapshotOverrides {
                current_profit: Some(dec!(0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(to_cents(partial.current_balance), dec!(11500.00));
    assert_eq!(to_cents(partial.initial_deposit), dec!(10000.00));
}

#[tokio::test]
async fn test_negative_override_leaves_snapshot_untouched() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "neg@example.com", dec!(250)).await;

    let result = store
        .update_snapshot(
            user.id,
            &SnapshotOverrides {
                monthly_topup: Some(dec!(-5)),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));

    let snapshot = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(snapshot.current_balance), dec!(250.00));
}

#[tokio::test]
async fn test_submit_over_balance_fails_and_persists_nothing() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "poor@example.com", dec!(150)).await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let result = workflow.submit(user.id, withdrawal(dec!(200))).await;
    assert!(matches!(result, Err(LedgerError::InsufficientBalance)));

    let rows = store.user_withdrawals(user.id).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_submit_below_minimum_is_a_validation_error() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "small@example.com", dec!(500)).await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let result = workflow.submit(user.id, withdrawal(dec!(49.99))).await;
    match result {
        Err(LedgerError::Validation(fields)) => assert_eq!(fields[0].field, "amount"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_approve_debits_balance_and_appends_one_withdrawal() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "rich@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_approve").await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(100))).await.unwrap();
    assert_eq!(request.status, "pending");

    // Submission alone does not move the balance
    let before = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(before.current_balance), dec!(500.00));

    let outcome = workflow
        .approve(request.id, operator_id, Some("0xabc".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.request.status, WithdrawalStatus::Completed.to_string());
    assert_eq!(outcome.request.processed_by, Some(operator_id));
    assert!(outcome.notification_delivered);
    assert_eq!(
        outcome.receipt_url.as_deref(),
        Some(format!("/uploads/receipts/receipt_WR-{}-test.txt", request.id).as_str())
    );

    let after = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(after.current_balance), dec!(400.00));
    assert_eq!(
        to_cents(after.total_deposited) + to_cents(after.current_profit),
        to_cents(after.current_balance)
    );

    let withdrawals = store
        .transactions_of_type(user.id, TransactionType::Withdrawal)
        .await
        .unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(to_cents(withdrawals[0].amount), dec!(100.00));
    assert_eq!(withdrawals[0].status, "confirmed");
    assert_eq!(withdrawals[0].receipt_ref, outcome.receipt_url);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "rich@example.com");
    assert_eq!(sent[0].1.kind, NotificationKind::WithdrawalReceipt);
}

#[tokio::test]
async fn test_second_resolution_is_already_processed() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "twice@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_twice").await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(100))).await.unwrap();
    workflow.approve(request.id, operator_id, None).await.unwrap();

    let again = workflow.approve(request.id, operator_id, None).await;
    assert!(matches!(again, Err(LedgerError::AlreadyProcessed)));

    let reject = workflow.reject(request.id, operator_id, "changed my mind").await;
    assert!(matches!(reject, Err(LedgerError::AlreadyProcessed)));

    let after = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(after.current_balance), dec!(400.00));
}

#[tokio::test]
async fn test_concurrent_approvals_debit_once() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "race@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_race").await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(100))).await.unwrap();

    let (first, second) = tokio::join!(
        workflow.approve(request.id, operator_id, None),
        workflow.approve(request.id, operator_id, None)
    );
    let successes = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    assert!(
        matches!(first, Err(LedgerError::AlreadyProcessed))
            || matches!(second, Err(LedgerError::AlreadyProcessed))
    );

    let after = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(after.current_balance), dec!(400.00));
    let withdrawals = store
        .transactions_of_type(user.id, TransactionType::Withdrawal)
        .await
        .unwrap();
    assert_eq!(withdrawals.len(), 1);
}

#[tokio::test]
async fn test_approve_rechecks_balance_and_keeps_request_pending() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "shrink@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_shrink").await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(300))).await.unwrap();
    store
        .update_snapshot(
            user.id,
            &SnapshotOverrides {
                initial_deposit: Some(dec!(200)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = workflow.approve(request.id, operator_id, None).await;
    assert!(matches!(result, Err(LedgerError::InsufficientBalance)));

    let still = store.find_withdrawal(request.id).await.unwrap().unwrap();
    assert_eq!(still.status, "pending");
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_receipt_and_delivery_failures_do_not_roll_back_approval() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "flaky@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_flaky").await;
    let notifier = RecordingNotifier::failing();
    let workflow = WithdrawalWorkflow::new(&store, &BrokenReceipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(100))).await.unwrap();
    let outcome = workflow.approve(request.id, operator_id, None).await.unwrap();

    assert!(!outcome.notification_delivered);
    assert!(outcome.receipt_url.is_none());
    assert_eq!(outcome.request.status, "completed");
    let after = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(after.current_balance), dec!(400.00));
}

#[tokio::test]
async fn test_reject_requires_reason_and_has_no_ledger_effect() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "nope@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_reject").await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(100))).await.unwrap();

    let blank = workflow.reject(request.id, operator_id, "   ").await;
    assert!(matches!(blank, Err(LedgerError::Validation(_))));

    let outcome = workflow
        .resolve(
            request.id,
            operator_id,
            Resolution {
                action: WithdrawalAction::Reject,
                reason: Some("Address mismatch".to_string()),
                transaction_hash: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.request.status, "rejected");
    assert_eq!(outcome.request.reason.as_deref(), Some("Address mismatch"));
    assert!(outcome.transaction.is_none());

    let after = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(after.current_balance), dec!(500.00));
    assert!(store
        .transactions_of_type(user.id, TransactionType::Withdrawal)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_resolving_unknown_request_is_not_found() {
    let store = setup_store().await;
    let operator_id = create_operator(&store, "ops_ghost").await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let result = workflow.approve(9999, operator_id, None).await;
    assert!(matches!(result, Err(LedgerError::NotFound(_))));
}

#[tokio::test]
async fn test_recorded_deposit_does_not_move_balance() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "book@example.com", dec!(100)).await;
    let operator_id = create_operator(&store, "ops_book").await;

    let recorded = TransactionRecorder::new(&store)
        .record(RecordRequest {
            user_id: user.id,
            transaction_type: "deposit".to_string(),
            amount: dec!(250),
            description: None,
            transaction_hash: None,
            operator_id: Some(operator_id),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(recorded.status, "confirmed");
    assert_eq!(recorded.processed_by, Some(operator_id));

    let snapshot = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(snapshot.current_balance), dec!(100.00));

    let bad = TransactionRecorder::new(&store)
        .record(RecordRequest {
            user_id: user.id,
            transaction_type: "bonus".to_string(),
            amount: dec!(1),
            description: None,
            transaction_hash: None,
            operator_id: Some(operator_id),
            status: None,
        })
        .await;
    assert!(matches!(bad, Err(LedgerError::InvalidType(_))));
}

#[tokio::test]
async fn test_delete_user_removes_ledger_and_keeps_activity() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "gone@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_delete").await;
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, notifier.as_ref());
    workflow.submit(user.id, withdrawal(dec!(60))).await.unwrap();

    mpi_ledger_backend::services::activity_log::record(
        &store,
        mpi_ledger_backend::services::activity_log::Actor::operator(operator_id, Some(user.id)),
        "investment_update",
        "before delete",
        &Default::default(),
    )
    .await;

    store.delete_user(user.id).await.unwrap();

    assert!(store.find_user(user.id).await.unwrap().is_none());
    assert!(store.snapshot(user.id).await.unwrap().is_none());
    assert!(store.user_withdrawals(user.id).await.unwrap().is_empty());

    let activity = store.list_activity(&Default::default()).await.unwrap();
    assert_eq!(activity.items.len(), 1);
    assert_eq!(activity.items[0].user_id, None);
    assert_eq!(activity.items[0].operator_id, Some(operator_id));

    assert!(matches!(
        store.delete_user(user.id).await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_stats_aggregate_snapshots() {
    let store = setup_store().await;
    create_user_with_balance(&store, "a@example.com", dec!(100)).await;
    create_user_with_balance(&store, "b@example.com", dec!(250.50)).await;

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.new_users_month, 2);
    assert_eq!(stats.total_deposited, dec!(350.50));
    assert_eq!(stats.total_balance, dec!(350.50));
    assert_eq!(stats.pending_withdrawals, 0);
}

#[tokio::test]
async fn test_delete_operator_keeps_resolved_history() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "kept@example.com", dec!(300)).await;
    let operator_id = create_operator(&store, "ops_leaving").await;
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &FixedReceipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(75))).await.unwrap();
    workflow.approve(request.id, operator_id, None).await.unwrap();

    store.delete_operator(operator_id).await.unwrap();
    assert!(store.find_operator(operator_id).await.unwrap().is_none());

    let withdrawals = store.user_withdrawals(user.id).await.unwrap();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].status, "completed");
    assert_eq!(withdrawals[0].processed_by, None);
    assert_eq!(withdrawals[0].processed_by_username, None);

    let debits = store
        .transactions_of_type(user.id, TransactionType::Withdrawal)
        .await
        .unwrap();
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].processed_by, None);

    let after = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(after.current_balance), dec!(225.00));

    assert!(matches!(
        store.delete_operator(operator_id).await,
        Err(LedgerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_page_beyond_the_end_is_empty() {
    let store = setup_store().await;
    create_user_with_balance(&store, "paged@example.com", dec!(100)).await;

    let page = PageQuery {
        page: Some(u64::MAX),
        limit: Some(20),
    };
    let users = store.list_users(None, &page).await.unwrap();
    assert!(users.items.is_empty());
    assert_eq!(users.pagination.total, 1);

    let activity = store.list_activity(&page).await.unwrap();
    assert!(activity.items.is_empty());
}

#[tokio::test]
async fn test_oversized_totals_leave_snapshot_untouched() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "whale@example.com", dec!(250)).await;

    let result = store
        .update_snapshot(
            user.id,
            &SnapshotOverrides {
                initial_deposit: Some(dec!(9999999999999.99)),
                monthly_topup: Some(dec!(9999999999999.99)),
                current_profit: Some(dec!(9999999999999.99)),
                target_cash: None,
            },
        )
        .await;
    assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));

    let snapshot = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(snapshot.total_deposited), dec!(250.00));
    assert_eq!(to_cents(snapshot.current_balance), dec!(250.00));
}

/// Writes real receipt files, but lets another operator reject the request
/// between rendering and the approval transaction
struct RejectingMidway {
    inner: FileReceiptRenderer,
    store: LedgerStore,
    operator_id: i32,
}

#[async_trait]
impl ReceiptRenderer for RejectingMidway {
    async fn render(&self, data: &ReceiptData) -> Option<String> {
        let url = self.inner.render(data).await;
        let notifier = RecordingNotifier::default();
        WithdrawalWorkflow::new(&self.store, &FixedReceipts, &notifier)
            .reject(data.withdrawal_id, self.operator_id, "Resolved by a colleague")
            .await
            .unwrap();
        url
    }

    async fn discard(&self, receipt_url: &str) {
        self.inner.discard(receipt_url).await
    }
}

#[tokio::test]
async fn test_losing_approval_leaves_no_receipt_file() {
    let store = setup_store().await;
    let user = create_user_with_balance(&store, "raced@example.com", dec!(500)).await;
    let operator_id = create_operator(&store, "ops_slow").await;
    let other_operator = create_operator(&store, "ops_fast").await;
    let dir = tempfile::tempdir().unwrap();
    let receipts = RejectingMidway {
        inner: FileReceiptRenderer::new(dir.path()),
        store: store.clone(),
        operator_id: other_operator,
    };
    let notifier = RecordingNotifier::default();
    let workflow = WithdrawalWorkflow::new(&store, &receipts, &notifier);

    let request = workflow.submit(user.id, withdrawal(dec!(100))).await.unwrap();
    let result = workflow.approve(request.id, operator_id, None).await;
    assert!(matches!(result, Err(LedgerError::AlreadyProcessed)));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    let after = store.snapshot(user.id).await.unwrap().unwrap();
    assert_eq!(to_cents(after.current_balance), dec!(500.00));
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_and_wrong_credentials_fail_alike() {
    let store = setup_store().await;
    create_user_with_balance(&store, "known@example.com", dec!(0)).await;
    create_operator(&store, "ops_known").await;

    let unknown = authenticate_user(&store, "nobody@example.com", TEST_PASSWORD).await;
    let wrong = authenticate_user(&store, "known@example.com", "not-the-password").await;
    assert!(matches!(unknown, Err(LedgerError::Unauthorized)));
    assert!(matches!(wrong, Err(LedgerError::Unauthorized)));
    assert!(authenticate_user(&store, "known@example.com", TEST_PASSWORD).await.is_ok());

    let unknown = authenticate_operator(&store, "ops_nobody", TEST_PASSWORD).await;
    let wrong = authenticate_operator(&store, "ops_known", "not-the-password").await;
    assert!(matches!(unknown, Err(LedgerError::Unauthorized)));
    assert!(matches!(wrong, Err(LedgerError::Unauthorized)));
}
