use axum::extract::{Path, Query, State};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::{DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{ProjectBundle, ProjectSummary};
use crate::error::ApiResult;
use crate::services::ProjectSort;

#[derive(Debug, Deserialize, Default)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub sort: ProjectSort,
}

/// List project bundles derived from the artifact list
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Paginated<ProjectSummary> {
    tracing::debug!(
        sort = ?query.sort,
        page = pagination.page(),
        per_page = pagination.per_page(),
        "Listing projects"
    );

    let summaries: Vec<ProjectSummary> = state
        .library
        .bundles(query.sort)
        .await
        .iter()
        .map(ProjectSummary::from)
        .collect();
    Paginated::from_slice(&summaries, &pagination)
}

/// Get one project bundle by key
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(project_key): Path<String>,
) -> ApiResult<DataResponse<ProjectBundle>> {
    Ok(DataResponse::new(state.library.bundle(&project_key).await?))
}
