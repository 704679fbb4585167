use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use band_manager_api::config::{Config, StoreBackend};
use band_manager_api::{app, jobs, middleware};
use domain::store::BandStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging and metrics
    middleware::logging::init_logging(&config.logging);
    middleware::metrics::init_metrics();

    info!("Starting Band Manager API v{}", env!("CARGO_PKG_VERSION"));

    // Select the storage backend
    let store: Arc<dyn BandStore> = match config.database.backend {
        StoreBackend::Postgres => {
            let pool = persistence::db::create_pool(&config.database.pool_settings()).await?;

            info!("Running database migrations...");
            sqlx::migrate!("../persistence/src/migrations")
                .run(&pool)
                .await?;
            info!("Migrations completed");

            Arc::new(persistence::PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; state will not survive a restart");
            Arc::new(persistence::MemoryStore::new())
        }
    };

    // Start background jobs
    let mut scheduler = jobs::JobScheduler::new();
    if config.jobs.pool_audit_enabled {
        scheduler.register(jobs::PoolAuditJob::new(
            store.clone(),
            config.jobs.pool_audit_interval_secs,
        ));
    }
    scheduler.start();

    // Build application
    let addr = config.socket_addr();
    let app = app::create_app(config, store);

    // Start server
    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drain background jobs before exiting
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
    }
}
