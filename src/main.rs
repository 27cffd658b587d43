use std::net::SocketAddr;
use std::sync::Arc;

use mpi_ledger_backend::config::AppConfig;
use mpi_ledger_backend::services::{
    bootstrap,
    identity::IdentityService,
    ledger_store::LedgerStore,
    notifier::{DisabledNotifier, NotificationSink, WebhookNotifier},
    receipts::FileReceiptRenderer,
};
use mpi_ledger_backend::{build_router, error, AppState};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mpi_ledger_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    error::expose_internal_detail(config.is_development());

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let store = LedgerStore::new(db);
    bootstrap::run(&store, &config).await?;

    let notifier: Arc<dyn NotificationSink> = match &config.mail_relay_url {
        Some(url) => Arc::new(WebhookNotifier::new(
            url.clone(),
            config.mail_from.clone(),
            config.contact_email.clone(),
            config.contact_phone.clone(),
        )?),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set; notifications will not be delivered");
            Arc::new(DisabledNotifier)
        }
    };

    let state = AppState {
        store,
        identity: IdentityService::from_config(&config),
        receipts: Arc::new(FileReceiptRenderer::new(config.receipts_dir.clone())),
        notifier,
        config: Arc::new(config),
    };
    let bind_addr = state.config.bind_addr;
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
