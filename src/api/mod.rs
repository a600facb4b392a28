//! HTTP API - thin axum layer over the core services.
//!
//! Every `/api` route except the cron trigger sits behind
//! [`identity::require_session`], so handlers only ever see a trusted user id.
//! Errors become JSON through the [`IntoResponse`](axum::response::IntoResponse)
//! impl in [`error`].

/// Billing cron trigger
pub mod billing;
/// Card handlers
pub mod cards;
/// Error to response mapping
pub mod error;
/// Session middleware
pub mod identity;
/// Subscription handlers
pub mod subscriptions;
/// Transaction handlers
pub mod transactions;

use crate::{config::settings::AppConfig, core::cipher::CardCipher};
use axum::{
    Json, Router, middleware,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Card number cipher, built once at startup
    pub cipher: Arc<CardCipher>,
    /// Runtime settings
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Bundles the pieces built at startup.
    #[must_use]
    pub fn new(db: DatabaseConnection, cipher: CardCipher, config: AppConfig) -> Self {
        Self {
            db: Arc::new(db),
            cipher: Arc::new(cipher),
            config: Arc::new(config),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/api/transactions/{id}",
            get(transactions::show)
                .put(transactions::update)
                .delete(transactions::remove),
        )
        .route(
            "/api/subscriptions",
            get(subscriptions::list).post(subscriptions::create),
        )
        .route("/api/subscriptions/{id}", put(subscriptions::update))
        .route("/api/cards", get(cards::list).post(cards::create))
        .route("/api/cards/{id}", put(cards::update))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            identity::require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/api/subscriptions/cron", post(billing::run_cron))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
