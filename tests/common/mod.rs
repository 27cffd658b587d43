#![allow(dead_code)]

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

use mpi_ledger_backend::config::{AppConfig, AppEnv};
use mpi_ledger_backend::entities::users;
use mpi_ledger_backend::services::identity::{hash_password, IdentityService};
use mpi_ledger_backend::services::ledger_store::{LedgerStore, NewOperatorRecord, NewUserRecord};
use mpi_ledger_backend::services::notifier::{Notification, NotificationSink};
use mpi_ledger_backend::services::receipts::{ReceiptData, ReceiptRenderer};
use mpi_ledger_backend::services::reconciler::SnapshotOverrides;
use mpi_ledger_backend::{build_router, AppState};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789";
pub const TEST_PASSWORD: &str = "password123";
pub const TEST_WALLET: &str = "bc1qtestwalletaddress0000000000000000000";

/// Set up test database connection
/// Uses TEST_DATABASE_URL or a private in-memory SQLite database, migrated.
/// One pooled connection keeps the in-memory database alive and shared.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let database_url =
        env::var("TEST_DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

    let mut options = ConnectOptions::new(database_url);
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup_store() -> LedgerStore {
    LedgerStore::new(setup_test_db().await.expect("test database"))
}

/// Records every notification; refuses delivery when `fail` is set
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, Notification)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<(String, Notification)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, user: &users::Model, notification: &Notification) -> bool {
        if self.fail.load(Ordering::SeqCst) {
            return false;
        }
        self.sent
            .lock()
            .unwrap()
            .push((user.email.clone(), notification.clone()));
        true
    }
}

/// Returns a predictable reference without touching the filesystem
pub struct FixedReceipts;

#[async_trait]
impl ReceiptRenderer for FixedReceipts {
    async fn render(&self, data: &ReceiptData) -> Option<String> {
        Some(format!("/uploads/receipts/receipt_WR-{}-test.txt", data.withdrawal_id))
    }
}

/// A renderer that always fails
pub struct BrokenReceipts;

#[async_trait]
impl ReceiptRenderer for BrokenReceipts {
    async fn render(&self, _data: &ReceiptData) -> Option<String> {
        None
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        app_env: AppEnv::Development,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        user_token_ttl_hours: 24,
        operator_token_ttl_hours: 8,
        bitcoin_wallet_address: TEST_WALLET.to_string(),
        default_operator: None,
        receipts_dir: PathBuf::from("./target/test-receipts"),
        mail_relay_url: None,
        mail_from: "no-reply@example.com".to_string(),
        contact_email: "support@example.com".to_string(),
        contact_phone: "+1 555 0100".to_string(),
        cors_origin: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(RecordingNotifier::default())).await
}

pub async fn spawn_app_with(notifier: Arc<RecordingNotifier>) -> TestApp {
    let store = setup_store().await;
    let config = test_config();
    mpi_ledger_backend::services::settings::ensure_defaults(&store, &config.bitcoin_wallet_address)
        .await
        .expect("seed settings");

    let state = AppState {
        store,
        identity: IdentityService::from_config(&config),
        config: Arc::new(config),
        notifier: notifier.clone(),
        receipts: Arc::new(FixedReceipts),
    };

    TestApp {
        router: build_router(state.clone()),
        state,
        notifier,
    }
}

/// A user whose snapshot holds `initial` as its only money
pub async fn create_user_with_balance(
    store: &LedgerStore,
    email: &str,
    initial: Decimal,
) -> users::Model {
    let user = store
        .create_user(NewUserRecord {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
        })
        .await
        .expect("create user");

    if !initial.is_zero() {
        store
            .update_snapshot(
                user.id,
                &SnapshotOverrides {
                    initial_deposit: Some(initial),
                    ..Default::default()
                },
            )
            .await
            .expect("fund user");
    }
    user
}

pub async fn create_operator(store: &LedgerStore, username: &str) -> i32 {
    store
        .create_operator(NewOperatorRecord {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role: "admin".to_string(),
        })
        .await
        .expect("create operator")
        .id
}
