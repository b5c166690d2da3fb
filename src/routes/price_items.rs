use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{DraftPatch, PriceItem, PriceItemInput};
use crate::error::{ApiError, ApiResult};
use crate::services::editor::EditState;
use crate::services::sync::{SyncReport, SyncState};
use crate::services::{DeleteOutcome, EditView};

/// List price items in table order
pub async fn list_price_items(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Paginated<PriceItem> {
    let items = state.catalog.list().await;
    Paginated::from_slice(&items, &pagination)
}

pub async fn get_price_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DataResponse<PriceItem>> {
    Ok(DataResponse::new(state.catalog.get(&id).await?))
}

/// Create a price item with a local id
pub async fn create_price_item(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PriceItemInput>,
) -> ApiResult<Created<PriceItem>> {
    tracing::info!(name = %input.name, "Creating price item");
    let item = state.catalog.create(input).await?;
    Ok(Created(item))
}

/// Delete locally, then best effort on the remote catalog
pub async fn delete_price_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DataResponse<DeleteOutcome>> {
    let outcome = state.catalog.delete(&id).await?;
    Ok(DataResponse::new(outcome))
}

/// Open an item for editing. Switching items may commit the previous draft,
/// so this runs on its own task like a commit does.
pub async fn begin_edit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<DataResponse<EditView>> {
    let catalog = state.catalog.clone();
    let view = tokio::spawn(async move { catalog.begin_edit(&id).await })
        .await
        .map_err(|e| ApiError::internal(format!("Edit task failed: {}", e)))??;
    Ok(DataResponse::new(view))
}

pub async fn get_edit_state(State(state): State<Arc<AppState>>) -> DataResponse<EditState> {
    DataResponse::new(state.catalog.edit_state().await)
}

pub async fn update_draft(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<DraftPatch>,
) -> ApiResult<DataResponse<EditState>> {
    Ok(DataResponse::new(state.catalog.update_draft(patch).await?))
}

/// Persist the open draft. A client that disconnects mid-commit does not
/// cancel the write.
pub async fn commit_edit(
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<PriceItem>> {
    let catalog = state.catalog.clone();
    let item = tokio::spawn(async move { catalog.commit_edit().await })
        .await
        .map_err(|e| ApiError::internal(format!("Commit task failed: {}", e)))??;
    Ok(DataResponse::new(item))
}

pub async fn cancel_edit(
    State(state): State<Arc<AppState>>,
) -> ApiResult<DataResponse<EditState>> {
    Ok(DataResponse::new(state.catalog.cancel_edit().await?))
}

/// Run one reconciliation pass against the remote catalog.
///
/// The pass runs on its own task: a client that disconnects stops waiting,
/// but the pass still finishes and still updates the local snapshot.
pub async fn run_sync(State(state): State<Arc<AppState>>) -> ApiResult<DataResponse<SyncReport>> {
    let catalog = state.catalog.clone();
    let report = tokio::spawn(async move { catalog.sync().await })
        .await
        .map_err(|e| ApiError::internal(format!("Sync task failed: {}", e)))??;
    Ok(DataResponse::new(report))
}

pub async fn get_sync_state(State(state): State<Arc<AppState>>) -> DataResponse<SyncState> {
    DataResponse::new(state.catalog.sync_state())
}
