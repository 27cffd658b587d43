//! Ledger store
//!
//! Durable access to users, operators, snapshots, transactions, withdrawal
//! requests, settings and the activity log. Every snapshot write goes
//! through the reconciler and runs inside a database transaction that
//! holds the snapshot row lock (`SELECT ... FOR UPDATE`). SQLite ignores the
//! lock clause; its single-writer transactions give the same ordering.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, info};

use crate::entities::prelude::*;
use crate::entities::{
    activity_logs, investment_snapshots, operators, settings, transactions, users,
    withdrawal_requests,
};
use crate::error::LedgerError;
use crate::models::admin::{LedgerStats, UserListEntry};
use crate::models::common::{PageQuery, Paged, Pagination};
use crate::models::ledger::{
    ActivityView, TransactionStatus, TransactionType, TransactionView, UserRef, WithdrawalStatus,
    WithdrawalView,
};
use crate::models::user::{NewWithdrawal, ProfileChanges};
use crate::services::money_utils::to_cents;
use crate::services::reconciler::{self, SnapshotFigures, SnapshotOverrides};

/// Insert payload for a user row; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewOperatorRecord {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i32,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub transaction_hash: Option<String>,
    pub receipt_ref: Option<String>,
    pub processed_by: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct NewActivity {
    pub user_id: Option<i32>,
    pub operator_id: Option<i32>,
    pub action: String,
    pub description: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct LedgerStore {
    db: DatabaseConnection,
}

impl LedgerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn begin(&self) -> Result<DatabaseTransaction, LedgerError> {
        Ok(self.db.begin().await?)
    }

    // ---------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------

    /// Create a user together with its default snapshot, atomically.
    pub async fn create_user(&self, new: NewUserRecord) -> Result<users::Model, LedgerError> {
        if self.find_user_by_email(&new.email).await?.is_some() {
            return Err(LedgerError::DuplicateEmail);
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let user = users::ActiveModel {
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            phone: Set(None),
            address: Set(None),
            is_active: Set(true),
            email_verified: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::DuplicateEmail
            } else {
                LedgerError::Storage(e)
            }
        })?;

        write_snapshot(&txn, user.id, None, &SnapshotFigures::default()).await?;
        txn.commit().await?;

        info!(user_id = user.id, "Created user with default snapshot");
        Ok(user)
    }

    pub async fn find_user(&self, id: i32) -> Result<Option<users::Model>, LedgerError> {
        Ok(Users::find_by_id(id).one(&self.db).await?)
    }

    pub async fn require_user(&self, id: i32) -> Result<users::Model, LedgerError> {
        self.find_user(id).await?.ok_or(LedgerError::NotFound("User"))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<users::Model>, LedgerError> {
        Ok(Users::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?)
    }

    /// Overwrite only the provided profile fields
    pub async fn update_profile(
        &self,
        id: i32,
        changes: ProfileChanges,
    ) -> Result<users::Model, LedgerError> {
        let user = self.require_user(id).await?;
        let mut active: users::ActiveModel = user.into();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(phone) = changes.phone {
            active.phone = Set(Some(phone).filter(|p| !p.is_empty()));
        }
        if let Some(address) = changes.address {
            active.address = Set(Some(address).filter(|a| !a.is_empty()));
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    /// Remove a user with snapshot, transactions and withdrawals. Activity
    /// rows survive with their user reference cleared.
    pub async fn delete_user(&self, id: i32) -> Result<users::Model, LedgerError> {
        let user = self.require_user(id).await?;
        let txn = self.db.begin().await?;

        ActivityLogs::update_many()
            .col_expr(activity_logs::Column::UserId, Expr::value(Option::<i32>::None))
            .filter(activity_logs::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        WithdrawalRequests::delete_many()
            .filter(withdrawal_requests::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        Transactions::delete_many()
            .filter(transactions::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        InvestmentSnapshots::delete_many()
            .filter(investment_snapshots::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        Users::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(user_id = id, "Deleted user and owned ledger rows");
        Ok(user)
    }

    /// Newest first, optional case-insensitive match on first name, last
    /// name or email, joined with the snapshot.
    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: &PageQuery,
    ) -> Result<Paged<UserListEntry>, LedgerError> {
        let mut condition = Condition::all();
        if let Some(term) = search {
            let pattern = format!("%{}%", term.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(users::Column::FirstName))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(users::Column::LastName))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(users::Column::Email))).like(pattern)),
            );
        }

        let total = Users::find().filter(condition.clone()).count(&self.db).await?;
        let rows = Users::find()
            .filter(condition)
            .find_also_related(InvestmentSnapshots)
            .order_by_desc(users::Column::CreatedAt)
            .order_by_desc(users::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(Paged {
            items: rows
                .iter()
                .map(|(user, snapshot)| UserListEntry::new(user, snapshot.as_ref()))
                .collect(),
            pagination: Pagination::new(page, total),
        })
    }

    // ---------------------------------------------------------------
    // Operators
    // ---------------------------------------------------------------

    pub async fn create_operator(
        &self,
        new: NewOperatorRecord,
    ) -> Result<operators::Model, LedgerError> {
        let existing = Operators::find()
            .filter(
                Condition::any()
                    .add(operators::Column::Username.eq(new.username.as_str()))
                    .add(operators::Column::Email.eq(new.email.as_str())),
            )
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(LedgerError::DuplicateUsername);
        }

        let operator = operators::ActiveModel {
            username: Set(new.username),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            role: Set(new.role),
            is_active: Set(true),
            last_login: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::DuplicateUsername
            } else {
                LedgerError::Storage(e)
            }
        })?;

        info!(operator_id = operator.id, username = %operator.username, "Created operator");
        Ok(operator)
    }

    pub async fn find_operator(&self, id: i32) -> Result<Option<operators::Model>, LedgerError> {
        Ok(Operators::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_operator_by_username(
        &self,
        username: &str,
    ) -> Result<Option<operators::Model>, LedgerError> {
        Ok(Operators::find()
            .filter(operators::Column::Username.eq(username.trim()))
            .one(&self.db)
            .await?)
    }

    pub async fn touch_operator_login(&self, id: i32) -> Result<(), LedgerError> {
        Operators::update_many()
            .col_expr(operators::Column::LastLogin, Expr::value(Some(Utc::now())))
            .filter(operators::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Business rows keep existing; their operator references are cleared.
    pub async fn delete_operator(&self, id: i32) -> Result<(), LedgerError> {
        if self.find_operator(id).await?.is_none() {
            return Err(LedgerError::NotFound("Operator"));
        }
        let txn = self.db.begin().await?;
        let cleared = Expr::value(Option::<i32>::None);

        ActivityLogs::update_many()
            .col_expr(activity_logs::Column::OperatorId, cleared.clone())
            .filter(activity_logs::Column::OperatorId.eq(id))
            .exec(&txn)
            .await?;
        Transactions::update_many()
            .col_expr(transactions::Column::ProcessedBy, cleared.clone())
            .filter(transactions::Column::ProcessedBy.eq(id))
            .exec(&txn)
            .await?;
        WithdrawalRequests::update_many()
            .col_expr(withdrawal_requests::Column::ProcessedBy, cleared)
            .filter(withdrawal_requests::Column::ProcessedBy.eq(id))
            .exec(&txn)
            .await?;
        Operators::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(operator_id = id, "Deleted operator");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Snapshots
    // ---------------------------------------------------------------

    pub async fn snapshot(
        &self,
        user_id: i32,
    ) -> Result<Option<investment_snapshots::Model>, LedgerError> {
        Ok(InvestmentSnapshots::find()
            .filter(investment_snapshots::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?)
    }

    /// Apply absolute overrides under the row lock and persist the
    /// reconciled figures. Creates the snapshot if the user has none.
    pub async fn update_snapshot(
        &self,
        user_id: i32,
        overrides: &SnapshotOverrides,
    ) -> Result<investment_snapshots::Model, LedgerError> {
        self.require_user(user_id).await?;

        let txn = self.db.begin().await?;
        let current = lock_snapshot(&txn, user_id).await?;
        let figures = reconciler::reconcile(
            current.as_ref().map(SnapshotFigures::from).as_ref(),
            overrides,
        )?;
        let saved = write_snapshot(&txn, user_id, current, &figures).await?;
        txn.commit().await?;

        debug!(
            user_id,
            balance = %figures.current_balance,
            progress = %figures.progress_percentage,
            "Snapshot reconciled"
        );
        Ok(saved)
    }

    // ---------------------------------------------------------------
    // Transactions
    // ---------------------------------------------------------------

    pub async fn append_transaction(
        &self,
        new: NewTransaction,
    ) -> Result<transactions::Model, LedgerError> {
        Ok(insert_transaction(&self.db, new).await?)
    }

    /// A user's history, newest first, with the recording operator's name
    pub async fn list_transactions(
        &self,
        user_id: i32,
        page: &PageQuery,
    ) -> Result<Paged<TransactionView>, LedgerError> {
        let total = Transactions::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;
        let rows = Transactions::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .find_also_related(Operators)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let items = rows
            .into_iter()
            .map(|(tx, operator)| {
                let mut view = TransactionView::from(tx);
                view.processed_by_username = operator.map(|o| o.username);
                view
            })
            .collect();

        Ok(Paged {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    /// Most recent transactions of one user
    pub async fn recent_transactions(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<TransactionView>, LedgerError> {
        let rows = Transactions::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(TransactionView::from).collect())
    }

    /// Most recent transactions across all users, with user name and email
    pub async fn recent_transactions_all(
        &self,
        limit: u64,
    ) -> Result<Vec<TransactionView>, LedgerError> {
        let rows = Transactions::find()
            .find_also_related(Users)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(tx, user)| {
                let mut view = TransactionView::from(tx);
                view.user = user.as_ref().map(UserRef::from);
                view
            })
            .collect())
    }

    pub async fn transactions_of_type(
        &self,
        user_id: i32,
        kind: TransactionType,
    ) -> Result<Vec<transactions::Model>, LedgerError> {
        Ok(Transactions::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::TransactionType.eq(kind.to_string()))
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await?)
    }

    // ---------------------------------------------------------------
    // Withdrawal requests
    // ---------------------------------------------------------------

    pub async fn create_withdrawal(
        &self,
        user_id: i32,
        request: &NewWithdrawal,
    ) -> Result<withdrawal_requests::Model, LedgerError> {
        let model = withdrawal_requests::ActiveModel {
            user_id: Set(user_id),
            amount: Set(to_cents(request.amount)),
            withdrawal_address: Set(request.withdrawal_address.clone()),
            status: Set(WithdrawalStatus::Pending.to_string()),
            reason: Set(Some(request.reason.clone())),
            receipt_ref: Set(None),
            processed_by: Set(None),
            requested_at: Set(Utc::now()),
            processed_at: Set(None),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        Ok(model)
    }

    pub async fn find_withdrawal(
        &self,
        id: i32,
    ) -> Result<Option<withdrawal_requests::Model>, LedgerError> {
        Ok(WithdrawalRequests::find_by_id(id).one(&self.db).await?)
    }

    /// A user's requests, newest first, with the resolving operator's name
    pub async fn user_withdrawals(&self, user_id: i32) -> Result<Vec<WithdrawalView>, LedgerError> {
        let rows = WithdrawalRequests::find()
            .filter(withdrawal_requests::Column::UserId.eq(user_id))
            .find_also_related(Operators)
            .order_by_desc(withdrawal_requests::Column::RequestedAt)
            .order_by_desc(withdrawal_requests::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(request, operator)| {
                let mut view = WithdrawalView::from(request);
                view.processed_by_username = operator.map(|o| o.username);
                view
            })
            .collect())
    }

    /// Operator listing, optionally filtered by status, with user info
    pub async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        page: &PageQuery,
    ) -> Result<Paged<WithdrawalView>, LedgerError> {
        let mut condition = Condition::all();
        if let Some(status) = status {
            condition = condition.add(withdrawal_requests::Column::Status.eq(status.to_string()));
        }

        let total = WithdrawalRequests::find()
            .filter(condition.clone())
            .count(&self.db)
            .await?;
        let rows = WithdrawalRequests::find()
            .filter(condition)
            .find_also_related(Users)
            .order_by_desc(withdrawal_requests::Column::RequestedAt)
            .order_by_desc(withdrawal_requests::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(Paged {
            items: rows.into_iter().map(with_user).collect(),
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn pending_withdrawals(&self) -> Result<Vec<WithdrawalView>, LedgerError> {
        let rows = WithdrawalRequests::find()
            .filter(withdrawal_requests::Column::Status.eq(WithdrawalStatus::Pending.to_string()))
            .find_also_related(Users)
            .order_by_desc(withdrawal_requests::Column::RequestedAt)
            .order_by_desc(withdrawal_requests::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(with_user).collect())
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    pub async fn setting(&self, key: &str) -> Result<Option<settings::Model>, LedgerError> {
        Ok(Settings::find()
            .filter(settings::Column::SettingKey.eq(key))
            .one(&self.db)
            .await?)
    }

    pub async fn all_settings(&self) -> Result<Vec<settings::Model>, LedgerError> {
        Ok(Settings::find()
            .order_by_asc(settings::Column::SettingKey)
            .all(&self.db)
            .await?)
    }

    pub async fn upsert_setting(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<settings::Model, LedgerError> {
        let now = Utc::now();
        match self.setting(key).await? {
            Some(existing) => {
                let mut active: settings::ActiveModel = existing.into();
                active.setting_value = Set(value.to_string());
                if let Some(description) = description {
                    active.description = Set(Some(description.to_string()));
                }
                active.updated_at = Set(now);
                Ok(active.update(&self.db).await?)
            }
            None => Ok(settings::ActiveModel {
                setting_key: Set(key.to_string()),
                setting_value: Set(value.to_string()),
                description: Set(description.map(str::to_string)),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await?),
        }
    }

    /// Returns true when the row was inserted
    pub async fn insert_setting_if_missing(
        &self,
        key: &str,
        value: &str,
        description: &str,
    ) -> Result<bool, LedgerError> {
        if self.setting(key).await?.is_some() {
            return Ok(false);
        }
        let inserted = settings::ActiveModel {
            setting_key: Set(key.to_string()),
            setting_value: Set(value.to_string()),
            description: Set(Some(description.to_string())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // ---------------------------------------------------------------
    // Activity log
    // ---------------------------------------------------------------

    pub async fn append_activity(
        &self,
        entry: NewActivity,
    ) -> Result<activity_logs::Model, LedgerError> {
        Ok(activity_logs::ActiveModel {
            user_id: Set(entry.user_id),
            operator_id: Set(entry.operator_id),
            action: Set(entry.action),
            description: Set(entry.description),
            ip_address: Set(entry.ip_address),
            user_agent: Set(entry.user_agent),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn list_activity(&self, page: &PageQuery) -> Result<Paged<ActivityView>, LedgerError> {
        let total = ActivityLogs::find().count(&self.db).await?;
        let rows = ActivityLogs::find()
            .order_by_desc(activity_logs::Column::CreatedAt)
            .order_by_desc(activity_logs::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(Paged {
            items: rows.into_iter().map(ActivityView::from).collect(),
            pagination: Pagination::new(page, total),
        })
    }

    // ---------------------------------------------------------------
    // Aggregates
    // ---------------------------------------------------------------

    pub async fn stats(&self) -> Result<LedgerStats, LedgerError> {
        let now = Utc::now();

        let (total_deposited, total_balance, total_profit) = InvestmentSnapshots::find()
            .select_only()
            .column_as(
                Expr::col(investment_snapshots::Column::TotalDeposited).sum(),
                "total_deposited",
            )
            .column_as(
                Expr::col(investment_snapshots::Column::CurrentBalance).sum(),
                "total_balance",
            )
            .column_as(
                Expr::col(investment_snapshots::Column::CurrentProfit).sum(),
                "total_profit",
            )
            .into_tuple::<(Option<Decimal>, Option<Decimal>, Option<Decimal>)>()
            .one(&self.db)
            .await?
            .unwrap_or((None, None, None));

        let total_users = Users::find().count(&self.db).await?;
        let new_users_month = Users::find()
            .filter(users::Column::CreatedAt.gte(now - Duration::days(30)))
            .count(&self.db)
            .await?;
        let pending_withdrawals = WithdrawalRequests::find()
            .filter(withdrawal_requests::Column::Status.eq(WithdrawalStatus::Pending.to_string()))
            .count(&self.db)
            .await?;
        let transactions_week = Transactions::find()
            .filter(transactions::Column::CreatedAt.gte(now - Duration::days(7)))
            .count(&self.db)
            .await?;

        Ok(LedgerStats {
            total_users,
            new_users_month,
            total_deposited: to_cents(total_deposited.unwrap_or_default()),
            total_balance: to_cents(total_balance.unwrap_or_default()),
            total_profit: to_cents(total_profit.unwrap_or_default()),
            pending_withdrawals,
            transactions_week,
        })
    }
}

fn with_user((request, user): (withdrawal_requests::Model, Option<users::Model>)) -> WithdrawalView {
    let mut view = WithdrawalView::from(request);
    view.user = user.as_ref().map(UserRef::from);
    view
}

/// Read a user's snapshot and hold its row lock until the transaction ends
pub(crate) async fn lock_snapshot<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Option<investment_snapshots::Model>, DbErr> {
    InvestmentSnapshots::find()
        .filter(investment_snapshots::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(conn)
        .await
}

/// Persist reconciled figures, updating `existing` or inserting a new row
pub(crate) async fn write_snapshot<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    existing: Option<investment_snapshots::Model>,
    figures: &SnapshotFigures,
) -> Result<investment_snapshots::Model, DbErr> {
    let now = Utc::now();
    let fill = |active: &mut investment_snapshots::ActiveModel| {
        active.initial_deposit = Set(figures.initial_deposit);
        active.monthly_topup = Set(figures.monthly_topup);
        active.total_deposited = Set(figures.total_deposited);
        active.current_profit = Set(figures.current_profit);
        active.target_cash = Set(figures.target_cash);
        active.current_balance = Set(figures.current_balance);
        active.progress_percentage = Set(figures.progress_percentage);
        active.last_updated = Set(now);
    };

    match existing {
        Some(model) => {
            let mut active: investment_snapshots::ActiveModel = model.into();
            fill(&mut active);
            active.update(conn).await
        }
        None => {
            let mut active = investment_snapshots::ActiveModel {
                user_id: Set(user_id),
                investment_start_date: Set(now),
                ..Default::default()
            };
            fill(&mut active);
            active.insert(conn).await
        }
    }
}

pub(crate) async fn lock_withdrawal<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<Option<withdrawal_requests::Model>, DbErr> {
    WithdrawalRequests::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await
}

pub(crate) async fn insert_transaction<C: ConnectionTrait>(
    conn: &C,
    new: NewTransaction,
) -> Result<transactions::Model, DbErr> {
    let now = Utc::now();
    let processed_at = match new.status {
        TransactionStatus::Pending => None,
        _ => Some(now),
    };
    transactions::ActiveModel {
        user_id: Set(new.user_id),
        transaction_type: Set(new.transaction_type.to_string()),
        amount: Set(to_cents(new.amount)),
        transaction_hash: Set(new.transaction_hash),
        status: Set(new.status.to_string()),
        description: Set(new.description),
        receipt_ref: Set(new.receipt_ref),
        processed_by: Set(new.processed_by),
        created_at: Set(now),
        processed_at: Set(processed_at),
        ..Default::default()
    }
    .insert(conn)
    .await
}
