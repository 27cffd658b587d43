//! Best-effort audit trail. A failed append is logged and swallowed so it
//! never fails the request that produced it.

use tracing::warn;

use crate::services::identity::RequestMeta;
use crate::services::ledger_store::{LedgerStore, NewActivity};

pub mod actions {
    pub const USER_REGISTRATION: &str = "user_registration";
    pub const USER_LOGIN: &str = "user_login";
    pub const ADMIN_LOGIN: &str = "admin_login";
    pub const PROFILE_UPDATE: &str = "profile_update";
    pub const WITHDRAWAL_REQUEST: &str = "withdrawal_request";
    pub const WITHDRAWAL_APPROVE: &str = "withdrawal_approve";
    pub const WITHDRAWAL_REJECT: &str = "withdrawal_reject";
    pub const INVESTMENT_UPDATE: &str = "investment_update";
    pub const TRANSACTION_ADDED: &str = "transaction_added";
    pub const DEPOSIT_SLIP_SENT: &str = "deposit_slip_sent";
    pub const SUMMARY_SENT: &str = "summary_sent";
    pub const SETTING_UPDATE: &str = "setting_update";
    pub const USER_DELETED: &str = "user_deleted";
}

/// Who did it, and from where
#[derive(Debug, Clone, Copy, Default)]
pub struct Actor {
    pub user_id: Option<i32>,
    pub operator_id: Option<i32>,
}

impl Actor {
    pub fn user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            operator_id: None,
        }
    }

    /// Operator acting on a user's ledger
    pub fn operator(operator_id: i32, user_id: Option<i32>) -> Self {
        Self {
            user_id,
            operator_id: Some(operator_id),
        }
    }
}

pub async fn record(
    store: &LedgerStore,
    actor: Actor,
    action: &str,
    description: impl Into<String>,
    meta: &RequestMeta,
) {
    let entry = NewActivity {
        user_id: actor.user_id,
        operator_id: actor.operator_id,
        action: action.to_string(),
        description: Some(description.into()),
        ip_address: meta.ip_address.clone(),
        user_agent: meta.user_agent.clone(),
    };
    if let Err(e) = store.append_activity(entry).await {
        warn!(action, error = %e, "Failed to append activity log entry");
    }
}
