// src/lib.rs

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use config::AppConfig;
use services::{
    identity::IdentityService, ledger_store::LedgerStore, notifier::NotificationSink,
    receipts::ReceiptRenderer,
};

#[derive(Clone)]
pub struct AppState {
    pub store: LedgerStore,
    pub config: Arc<AppConfig>,
    pub identity: IdentityService,
    pub notifier: Arc<dyn NotificationSink>,
    pub receipts: Arc<dyn ReceiptRenderer>,
}

pub mod entities {
    pub mod prelude;
    pub mod activity_logs;
    pub mod investment_snapshots;
    pub mod operators;
    pub mod settings;
    pub mod transactions;
    pub mod users;
    pub mod withdrawal_requests;
}

pub mod services {
    pub mod activity_log;
    pub mod bootstrap;
    pub mod identity;
    pub mod ledger_store;
    pub mod money_utils;
    pub mod notifier;
    pub mod receipts;
    pub mod reconciler;
    pub mod settings;
    pub mod transaction_recorder;
    pub mod withdrawal_workflow;
}

pub mod config;
pub mod error;
pub mod models;
pub mod handlers;

/// `x-request-id` for requests that arrive without one
#[derive(Clone, Copy, Default)]
struct RequestUuid;

impl MakeRequestId for RequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// All routes, with CORS, request ids and request tracing applied
pub fn build_router(state: AppState) -> Router {
    use handlers::{admin, auth, health, user};

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin-login", post(auth::operator_login))
        .route("/admin/login", post(auth::operator_login))
        .route("/verify", get(auth::verify))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/dashboard", get(user::dashboard))
        .route("/deposit-info", get(user::deposit_info))
        .route("/withdraw", post(user::withdraw))
        .route("/withdrawals", get(user::withdrawals))
        .route("/transactions", get(user::transactions))
        .route("/profile", get(user::profile).put(user::update_profile));

    let admin_routes = Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/stats", get(admin::stats))
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/investment", put(admin::update_investment))
        .route("/users/{id}/transactions", post(admin::add_transaction))
        .route("/users/{id}/send-deposit-slip", post(admin::send_deposit_slip))
        .route("/users/{id}/send-summary", post(admin::send_summary))
        .route("/withdrawals", get(admin::list_withdrawals))
        .route("/withdrawals/{id}", put(admin::resolve_withdrawal))
        .route("/settings", get(admin::list_settings))
        .route("/settings/{key}", put(admin::update_setting))
        .route("/activity", get(admin::list_activity));

    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/user", user_routes)
        .nest("/api/admin", admin_routes)
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(RequestUuid))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(AllowOrigin::exact(value)),
        Some(Err(e)) => {
            warn!(error = %e, "CORS_ORIGIN is not a valid header value; allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
