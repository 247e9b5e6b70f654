use arena_server::{api, auth, config, create_app, db, ledger, requests, tournament, ws};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load config
    let config = config::Config::from_env();
    tracing::info!("Starting arena server on {}", config.server_addr());

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    // Run migrations
    db::run_migrations(&pool).await?;

    // Create JWT manager and the realtime event hub
    let jwt_manager = Arc::new(auth::JwtManager::new(config.jwt_secret.clone()));
    let events = Arc::new(ws::EventHub::new(jwt_manager.clone()));

    // Wire the domain services around the shared pool
    let store = tournament::TournamentStore::new(pool.clone(), events.clone());

    let state = Arc::new(api::AppState {
        pool: pool.clone(),
        jwt_manager,
        events: events.clone(),
        ledger: ledger::LedgerStore::new(pool.clone(), events.clone()),
        tournaments: tournament::TournamentManager::new(store),
        payments: requests::PaymentManager::new(pool.clone(), events.clone()),
        withdrawals: requests::WithdrawalManager::new(pool, events),
        admin_emails: config.admin_emails.clone(),
    });

    // Build router using lib function
    let app = create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server_addr()).await?;
    tracing::info!("Server listening on {}", config.server_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
