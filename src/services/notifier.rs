//! Notification sink
//!
//! Deposit slips, investment summaries and withdrawal receipts are rendered
//! to plain text here and handed to a [`NotificationSink`]. Delivery only
//! reports a boolean; a failed delivery never undoes the ledger change that
//! triggered it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entities::{users, withdrawal_requests};
use crate::models::ledger::{TransactionType, TransactionView};
use crate::services::money_utils::format_usd;
use crate::services::reconciler::SnapshotFigures;

const RELAY_TIMEOUT_SECS: u64 = 10;
const SUMMARY_TRANSACTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DepositSlip,
    Summary,
    WithdrawalReceipt,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::DepositSlip => write!(f, "deposit_slip"),
            NotificationKind::Summary => write!(f, "summary"),
            NotificationKind::WithdrawalReceipt => write!(f, "withdrawal_receipt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Attempt delivery to `user`; true when the message was accepted
    async fn notify(&self, user: &users::Model, notification: &Notification) -> bool;
}

/// Delivers through an HTTP mail relay accepting `{to, from, subject, body}`
pub struct WebhookNotifier {
    client: Client,
    relay_url: String,
    from: String,
    contact_email: String,
    contact_phone: String,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    body: String,
    kind: NotificationKind,
}

impl WebhookNotifier {
    pub fn new(
        relay_url: String,
        from: String,
        contact_email: String,
        contact_phone: String,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(RELAY_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            relay_url,
            from,
            contact_email,
            contact_phone,
        })
    }

    fn with_footer(&self, body: &str) -> String {
        let mut text = body.to_string();
        if !self.contact_email.is_empty() || !self.contact_phone.is_empty() {
            text.push_str("\nQuestions? Contact us:\n");
            if !self.contact_email.is_empty() {
                text.push_str(&format!("  Email: {}\n", self.contact_email));
            }
            if !self.contact_phone.is_empty() {
                text.push_str(&format!("  Phone: {}\n", self.contact_phone));
            }
        }
        text.push_str("\nThis is an automated message. Please do not reply.\n");
        text
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, user: &users::Model, notification: &Notification) -> bool {
        let message = RelayMessage {
            to: &user.email,
            from: &self.from,
            subject: &notification.subject,
            body: self.with_footer(&notification.body),
            kind: notification.kind,
        };

        match self.client.post(&self.relay_url).json(&message).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(user_id = user.id, kind = %notification.kind, "Notification delivered");
                true
            }
            Ok(response) => {
                warn!(
                    user_id = user.id,
                    kind = %notification.kind,
                    status = %response.status(),
                    "Mail relay refused notification"
                );
                false
            }
            Err(e) => {
                warn!(user_id = user.id, kind = %notification.kind, error = %e, "Mail relay unreachable");
                false
            }
        }
    }
}

/// Used when no relay is configured; every delivery reports failure
pub struct DisabledNotifier;

#[async_trait]
impl NotificationSink for DisabledNotifier {
    async fn notify(&self, user: &users::Model, notification: &Notification) -> bool {
        warn!(
            user_id = user.id,
            kind = %notification.kind,
            "Notification dropped: MAIL_RELAY_URL is not set"
        );
        false
    }
}

pub fn render_deposit_slip(
    user: &users::Model,
    kind: TransactionType,
    amount: Decimal,
    before: &SnapshotFigures,
    after: &SnapshotFigures,
    note: Option<&str>,
) -> Notification {
    let slip_id = format!("DS-{}", Utc::now().timestamp_millis());
    let label = kind.to_string().to_uppercase();

    let mut body = format!(
        "Dear {},\n\nYour {} has been processed.\n\n\
         Slip ID: {}\nDate: {}\nTransaction Type: {}\nAmount: {}\n",
        user.full_name(),
        kind,
        slip_id,
        Utc::now().format("%Y-%m-%d"),
        label,
        format_usd(amount),
    );
    if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
        body.push_str(&format!("Note: {}\n", note.trim()));
    }
    body.push_str(&format!(
        "\nACCOUNT SUMMARY\n\
         Previous Total Deposited: {}\n\
         New Total Deposited: {}\n\
         Current Profit: {}\n\
         New Account Balance: {}\n\
         Target Goal: {}\n\
         Progress: {}%\n",
        format_usd(before.total_deposited),
        format_usd(after.total_deposited),
        format_usd(after.current_profit),
        format_usd(after.current_balance),
        format_usd(after.target_cash),
        after.progress_percentage,
    ));

    Notification {
        kind: NotificationKind::DepositSlip,
        subject: format!("MPI Strategy - {} Confirmation - {}", label, format_usd(amount)),
        body,
    }
}

pub fn render_summary(
    user: &users::Model,
    figures: &SnapshotFigures,
    recent: &[TransactionView],
) -> Notification {
    let today = Utc::now().format("%Y-%m-%d");
    let mut body = format!(
        "Dear {},\n\nHere is your investment summary as of {}.\n\n\
         Current Account Balance: {}\n\n\
         Initial Deposit: {}\n\
         Monthly Top-ups: {}\n\
         Total Deposited: {}\n\
         Current Profit: {}\n\
         Target Goal: {}\n\
         Progress: {}% complete\n",
        user.full_name(),
        today,
        format_usd(figures.current_balance),
        format_usd(figures.initial_deposit),
        format_usd(figures.monthly_topup),
        format_usd(figures.total_deposited),
        format_usd(figures.current_profit),
        format_usd(figures.target_cash),
        figures.progress_percentage,
    );

    if !recent.is_empty() {
        body.push_str("\nRECENT TRANSACTIONS\n");
        for tx in recent.iter().take(SUMMARY_TRANSACTIONS) {
            body.push_str(&format!(
                "  {}  {:<10}  {:>14}  {}\n",
                tx.created_at.format("%Y-%m-%d"),
                tx.transaction_type.to_uppercase(),
                format_usd(tx.amount),
                tx.status.to_uppercase(),
            ));
        }
    }

    Notification {
        kind: NotificationKind::Summary,
        subject: format!("MPI Strategy - Investment Summary - {}", today),
        body,
    }
}

pub fn render_withdrawal_receipt(
    user: &users::Model,
    request: &withdrawal_requests::Model,
    receipt_url: Option<&str>,
) -> Notification {
    let mut body = format!(
        "Dear {},\n\nYour withdrawal request #{} has been processed.\n\n\
         Amount: {}\nWithdrawal Address: {}\nStatus: Completed\n",
        user.full_name(),
        request.id,
        format_usd(request.amount),
        request.withdrawal_address,
    );
    if let Some(url) = receipt_url {
        body.push_str(&format!("Receipt: {}\n", url));
    }

    Notification {
        kind: NotificationKind::WithdrawalReceipt,
        subject: format!("MPI Strategy - Withdrawal Receipt - {}", format_usd(request.amount)),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reconciler::{reconcile, SnapshotOverrides};
    use rust_decimal_macros::dec;

    fn user() -> users::Model {
        users::Model {
            id: 7,
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            password_hash: String::new(),
            phone: None,
            address: None,
            is_active: true,
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn figures() -> SnapshotFigures {
        reconcile(
            None,
            &SnapshotOverrides {
                initial_deposit: Some(dec!(10000)),
                monthly_topup: Some(dec!(1500)),
                current_profit: Some(dec!(2340)),
                target_cash: Some(dec!(500000)),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_deposit_slip_shows_projected_totals() {
        let before = figures();
        let after = crate::services::reconciler::project_deposit(
            Some(&before),
            TransactionType::Deposit,
            dec!(1000),
        )
        .unwrap();
        let n = render_deposit_slip(&user(), TransactionType::Deposit, dec!(1000), &before, &after, None);
        assert_eq!(n.kind, NotificationKind::DepositSlip);
        assert!(n.subject.contains("DEPOSIT"));
        assert!(n.body.contains("Previous Total Deposited: $11,500.00"));
        assert!(n.body.contains("New Total Deposited: $12,500.00"));
        assert!(n.body.contains("New Account Balance: $14,840.00"));
    }

    #[test]
    fn test_summary_lists_at_most_five_transactions() {
        let tx = TransactionView {
            id: 1,
            user_id: 7,
            transaction_type: "profit".to_string(),
            amount: dec!(12.5),
            transaction_hash: None,
            status: "confirmed".to_string(),
            description: None,
            receipt_url: None,
            processed_by: None,
            processed_by_username: None,
            user: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        let recent = vec![tx; 8];
        let n = render_summary(&user(), &figures(), &recent);
        assert!(n.body.contains("Current Account Balance: $13,840.00"));
        assert!(n.body.contains("Progress: 2.77% complete"));
        assert_eq!(n.body.matches("PROFIT").count(), 5);
    }

    #[tokio::test]
    async fn test_disabled_notifier_reports_failure() {
        let n = render_summary(&user(), &figures(), &[]);
        assert!(!DisabledNotifier.notify(&user(), &n).await);
    }
}
