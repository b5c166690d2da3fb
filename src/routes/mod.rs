pub mod artifacts;
pub mod estimates;
pub mod events;
pub mod health;
pub mod price_items;
pub mod projects;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        // Price items
        .route(
            "/price-items",
            get(price_items::list_price_items).post(price_items::create_price_item),
        )
        .route(
            "/price-items/edit",
            get(price_items::get_edit_state)
                .patch(price_items::update_draft)
                .delete(price_items::cancel_edit),
        )
        .route("/price-items/edit/commit", post(price_items::commit_edit))
        .route(
            "/price-items/sync",
            get(price_items::get_sync_state).post(price_items::run_sync),
        )
        .route(
            "/price-items/:id",
            get(price_items::get_price_item).delete(price_items::delete_price_item),
        )
        .route("/price-items/:id/edit", post(price_items::begin_edit))
        // Artifacts
        .route(
            "/artifacts",
            get(artifacts::list_artifacts).post(artifacts::register_artifacts),
        )
        .route(
            "/artifacts/:id",
            get(artifacts::get_artifact).delete(artifacts::delete_artifact),
        )
        // Projects (derived from artifacts)
        .route("/projects", get(projects::list_projects))
        .route("/projects/:project_key", get(projects::get_project))
        .route(
            "/projects/:project_key/estimates",
            post(estimates::generate_estimate),
        )
        // Estimates
        .route("/estimates", get(estimates::list_estimates))
        .route("/estimates/:id", get(estimates::get_estimate))
        // Engine events
        .route("/events", get(events::event_stream))
}
