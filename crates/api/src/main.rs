use std::time::Duration;

use anyhow::{Context, Result};
use shared::jwt::JwtConfig;
use tracing::info;

use decision_export_api::app::{create_app, AppState, Collaborators};
use decision_export_api::config::Config;
use decision_export_api::jobs::{JobScheduler, PoolMetricsJob, StaleExportReaperJob};
use decision_export_api::middleware;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting Decision Export API v{}", env!("CARGO_PKG_VERSION"));

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;

    let jwt = JwtConfig::for_validation(&config.jwt.public_key, config.jwt.leeway_secs)
        .context("Invalid JWT public key")?;
    let collaborators = Collaborators::from_config(&config, &pool)?;

    // Each export ensures the bucket again.
    if let Err(e) = collaborators.storage.ensure_bucket().await {
        tracing::warn!(error = %e, "Artifact storage not ready at startup");
    }

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.register(StaleExportReaperJob::new(
        collaborators.jobs.clone(),
        config.export.stale_job_timeout_secs,
        config.export.reaper_interval_secs,
    ));
    scheduler.start();

    let addr = config.socket_addr();
    let app = create_app(AppState::new(config, pool, jwt, collaborators));

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler
        .wait_for_shutdown(Duration::from_secs(10))
        .await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
