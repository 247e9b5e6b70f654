//! Arena Server Library
//!
//! This module exposes the server components for integration testing.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod ledger;
pub mod requests;
pub mod tournament;
pub mod ws;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Creates the application router with all endpoints
pub fn create_app(state: Arc<api::AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let events = state.events.clone();

    Router::new()
        .route("/", get(|| async { "Arena Server" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api/auth", api::auth_router().with_state(state.clone()))
        .nest(
            "/api/profile",
            api::profile_router().with_state(state.clone()),
        )
        .nest(
            "/api/wallet",
            api::wallet_router().with_state(state.clone()),
        )
        .nest(
            "/api/tournaments",
            api::tournaments_router().with_state(state.clone()),
        )
        .nest(
            "/api/payments",
            api::payments_router().with_state(state.clone()),
        )
        .nest(
            "/api/withdrawals",
            api::withdrawals_router().with_state(state),
        )
        .route("/ws", get(ws::ws_handler).with_state(events))
        .layer(cors)
}

/// Test helper: an in-memory database on a single-connection pool, so that
/// every test query sees the same database and concurrent requests
/// serialize instead of racing.
pub async fn create_test_db() -> db::DbPool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// Test helper to create a fully configured test app
pub async fn create_test_app() -> (Router, Arc<api::AppState>) {
    let pool = create_test_db().await;
    let jwt_manager = Arc::new(auth::JwtManager::new("test_secret_key".to_string()));
    let events = Arc::new(ws::EventHub::new(jwt_manager.clone()));

    let store = tournament::TournamentStore::new(pool.clone(), events.clone());

    let state = Arc::new(api::AppState {
        pool: pool.clone(),
        jwt_manager,
        events: events.clone(),
        ledger: ledger::LedgerStore::new(pool.clone(), events.clone()),
        tournaments: tournament::TournamentManager::new(store),
        payments: requests::PaymentManager::new(pool.clone(), events.clone()),
        withdrawals: requests::WithdrawalManager::new(pool.clone(), events),
        admin_emails: vec!["admin@example.com".to_string()],
    });

    let app = create_app(state.clone());
    (app, state)
}
