use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::services::sync::SyncState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub snapshot_store: String,
    pub snapshot_backend: String,
    pub remote_catalog: String,
    pub sync: SyncState,
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let store_result = state.store.health_check().await;
    if let Err(e) = &store_result {
        tracing::warn!(error = %e, "Snapshot store health check failed");
    }

    // Without a remote the engine still works offline, so only the store is critical
    let remote_status = if state.remote_configured { "configured" } else { "offline" };
    let status = match (store_result.is_ok(), state.remote_configured) {
        (false, _) => "unhealthy",
        (true, true) => "healthy",
        (true, false) => "degraded",
    };

    let status_code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                snapshot_store: if store_result.is_ok() { "ok" } else { "error" }.to_string(),
                snapshot_backend: state.store.backend().to_string(),
                remote_catalog: remote_status.to_string(),
                sync: state.catalog.sync_state(),
            },
        }),
    )
}
