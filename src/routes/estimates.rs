use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{BidEstimate, EstimateRequest, EstimateSummary};
use crate::error::{ApiError, ApiResult};

/// Generate and persist an estimate for a project.
///
/// Runs on its own task so the write completes even if the client goes away.
pub async fn generate_estimate(
    State(state): State<Arc<AppState>>,
    Path(project_key): Path<String>,
    Json(req): Json<EstimateRequest>,
) -> ApiResult<Created<BidEstimate>> {
    tracing::info!(
        project_key = %project_key,
        project_type = %req.project_type,
        "Generating bid estimate"
    );

    let book = state.estimates.clone();
    let estimate = tokio::spawn(async move { book.generate(&project_key, &req).await })
        .await
        .map_err(|e| ApiError::internal(format!("Estimate task failed: {}", e)))??;
    Ok(Created(estimate))
}

/// List estimates, newest first
pub async fn list_estimates(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Paginated<EstimateSummary> {
    let summaries: Vec<EstimateSummary> = state
        .estimates
        .list()
        .await
        .iter()
        .map(EstimateSummary::from)
        .collect();
    Paginated::from_slice(&summaries, &pagination)
}

pub async fn get_estimate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<DataResponse<BidEstimate>> {
    Ok(DataResponse::new(state.estimates.get(id).await?))
}
