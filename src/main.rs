use anyhow::Result;

use bidsync_backend::{app, config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        backend = ?settings.snapshot_backend,
        remote = settings.remote_catalog_url.as_deref().unwrap_or("offline"),
        "Starting bidsync backend"
    );

    // Build store, remote catalog and estimator, then load every table
    let state = app::AppState::from_settings(settings.clone()).await?;

    // Check the snapshot store without blocking startup
    tokio::spawn({
        let state = state.clone();
        async move {
            match state.store.health_check().await {
                Ok(()) => tracing::info!("Snapshot store is healthy"),
                Err(e) => tracing::warn!(error = %e, "Snapshot store health check failed"),
            }
        }
    });

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
