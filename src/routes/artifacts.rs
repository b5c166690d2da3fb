use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{ProjectArtifact, RegisterArtifactsRequest};
use crate::error::ApiResult;

/// List artifacts in upload order
pub async fn list_artifacts(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Paginated<ProjectArtifact> {
    let artifacts = state.library.list().await;
    Paginated::from_slice(&artifacts, &pagination)
}

pub async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<ProjectArtifact>> {
    Ok(DataResponse::new(state.library.get(id).await?))
}

/// Register metadata for a batch of uploaded files
pub async fn register_artifacts(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterArtifactsRequest>,
) -> ApiResult<Created<Vec<ProjectArtifact>>> {
    tracing::info!(count = req.files.len(), "Registering artifacts");
    let added = state.library.register(req.files).await?;
    Ok(Created(added))
}

/// Artifacts are never updated, only removed
pub async fn delete_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<NoContent> {
    let removed = state.library.delete(id).await?;
    tracing::info!(id = %removed.id, file_name = %removed.file_name, "Artifact deleted");
    Ok(NoContent)
}
