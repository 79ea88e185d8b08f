use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use fieldtrack_presence::alerts::{AlertDispatcher, LogDispatcher, PushDispatcher};
use fieldtrack_presence::auth::JwtVerifier;
use fieldtrack_presence::config::AppConfig;
use fieldtrack_presence::gateway::keepalive;
use fieldtrack_presence::registry::ConnectionRegistry;
use fieldtrack_presence::routes;
use fieldtrack_presence::scanner::EscalationScanner;
use fieldtrack_presence::state::ServiceState;
use fieldtrack_presence::store::PgStore;
use fieldtrack_presence::{db, store::LivenessStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Fieldtrack Presence Service...");

    // Init DB
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;
    info!("Connected to database");

    let store: Arc<dyn LivenessStore> = Arc::new(PgStore::new(pool));
    let registry = ConnectionRegistry::new();
    let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret));

    let dispatcher: Arc<dyn AlertDispatcher> = if config.push_api_url.is_empty() {
        Arc::new(LogDispatcher)
    } else {
        let api_key = (!config.push_api_key.is_empty()).then(|| config.push_api_key.clone());
        Arc::new(PushDispatcher::new(config.push_api_url.clone(), api_key)?)
    };

    // Background safety nets
    keepalive::spawn_keepalive(
        registry.clone(),
        Duration::from_secs(config.keepalive_interval_secs),
    );
    EscalationScanner::new(
        store.clone(),
        dispatcher,
        chrono::Duration::seconds(config.heartbeat_threshold_secs),
        chrono::Duration::seconds(config.movement_threshold_secs),
        Duration::from_secs(config.scan_interval_secs),
    )
    .spawn();

    let state = ServiceState::new(registry.clone(), store, verifier);
    let app = routes::build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;

    Ok(())
}

/// Waits for ctrl-c, then broadcasts a normal close to every open
/// channel before the process exits.
async fn shutdown_signal(registry: ConnectionRegistry) {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received, closing client connections");
    registry.shutdown_all();
}
