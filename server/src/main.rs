//! Tenant Association Server - Main Entry Point

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use tenant_server::email::EmailDispatcher;
use tenant_server::workflow::{
    spawn_event_worker, EventBus, Links, PgStepStore, PgVerificationStore, Runtime,
};
use tenant_server::{api, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tenant_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        "Starting Tenant Association Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;
    db::spawn_session_cleanup_task(db_pool.clone());

    // Initialize Redis
    let redis = db::create_redis_client(&config.redis_url).await?;

    // Workflow runtime and its worker
    let bus = Arc::new(EventBus::new(redis.clone()));
    let runtime = Arc::new(Runtime::new(
        Arc::new(PgVerificationStore::new(db_pool.clone())),
        Arc::new(PgStepStore::new(db_pool.clone())),
        bus.clone(),
        EmailDispatcher::from_config(&config)?,
        Links::from_config(&config),
    ));
    tokio::spawn(spawn_event_worker(db_pool.clone(), redis, runtime));
    info!("Workflow runtime initialized");

    if config.event_key.is_none() {
        tracing::warn!("EVENT_KEY not set. Signed event ingest disabled.");
    }

    // Build application state
    let state = api::AppState::new(db_pool, config.clone(), bus);

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
