//! HTTP surface tests against the real router with an in-memory store.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use bidsync_backend::app::{create_app, AppState};
use bidsync_backend::config::Settings;
use bidsync_backend::domain::PriceItem;
use bidsync_backend::services::random::FixedRandom;
use bidsync_backend::services::{MemoryStore, OfflineCatalog, RemoteCatalog, RemoteError};

/// Remote catalog kept in memory; ids are handed out as `srv-N`.
#[derive(Default)]
struct InMemoryCatalog {
    records: Mutex<Vec<PriceItem>>,
    next_id: AtomicUsize,
}

#[async_trait]
impl RemoteCatalog<PriceItem> for InMemoryCatalog {
    async fn list(&self) -> Result<Vec<PriceItem>, RemoteError> {
        Ok(self.records.lock().clone())
    }

    async fn create(&self, record: &PriceItem) -> Result<PriceItem, RemoteError> {
        let mut created = record.clone();
        created.id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.records.lock().push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, record: &PriceItem) -> Result<PriceItem, RemoteError> {
        let mut records = self.records.lock();
        let slot = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        *slot = record.clone();
        Ok(slot.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.records.lock().retain(|r| r.id != id);
        Ok(())
    }
}

async fn app_with(remote: Arc<dyn RemoteCatalog<PriceItem>>) -> Router {
    let state = AppState::new(
        Settings::default(),
        Arc::new(MemoryStore::new()),
        remote,
        Arc::new(FixedRandom(0.0)),
    )
    .await;
    create_app(state)
}

async fn offline_app() -> Router {
    app_with(Arc::new(OfflineCatalog)).await
}

async fn send(app: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(path);
    let body = match body {
        Some(json_body) => {
            request = request.header("content-type", "application/json");
            Body::from(json_body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_offline_remote_as_degraded() {
    let app = offline_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["snapshot_store"], "ok");
    assert_eq!(body["services"]["remote_catalog"], "offline");
}

#[tokio::test]
async fn price_item_validation_and_listing() {
    let app = offline_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/price-items",
        Some(json!({"name": "Desk", "price": "10.50"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["price"], 10.5);
    assert!(body["data"]["id"].as_str().unwrap().starts_with("local-"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/price-items",
        Some(json!({"name": "", "price": "10"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["request_id"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/price-items",
        Some(json!({"name": "Desk", "price": "-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, Method::GET, "/price-items?per_page=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn switching_edits_commits_the_previous_draft() {
    let app = offline_app().await;
    let (_, desk) = send(&app, Method::POST, "/price-items", Some(json!({"name": "Desk", "price": 10}))).await;
    let (_, chair) = send(&app, Method::POST, "/price-items", Some(json!({"name": "Chair", "price": 5}))).await;
    let desk_id = desk["data"]["id"].as_str().unwrap().to_string();
    let chair_id = chair["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::POST, &format!("/price-items/{desk_id}/edit"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["session"]["state"], "editing");

    let (status, _) = send(&app, Method::PATCH, "/price-items/edit", Some(json!({"price": "12.5"}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, &format!("/price-items/{chair_id}/edit"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["auto_committed"]["price"], 12.5);
    assert_eq!(body["data"]["session"]["item_id"], chair_id.as_str());

    let (status, body) = send(&app, Method::DELETE, "/price-items/edit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "viewing");

    let (status, body) = send(&app, Method::POST, "/price-items/edit/commit", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn sync_pushes_local_items_and_adopts_server_ids() {
    let remote = Arc::new(InMemoryCatalog::default());
    let app = app_with(remote.clone()).await;
    send(&app, Method::POST, "/price-items", Some(json!({"name": "Desk", "price": 10}))).await;

    let (status, body) = send(&app, Method::POST, "/price-items/sync", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], 1);
    assert_eq!(body["data"]["updated"], 0);
    assert_eq!(body["data"]["assigned_ids"][0]["remote_id"], "srv-1");

    let (_, body) = send(&app, Method::GET, "/price-items", None).await;
    assert_eq!(body["data"][0]["id"], "srv-1");

    let (_, body) = send(&app, Method::GET, "/price-items/sync", None).await;
    assert_eq!(body["data"]["status"], "idle");
    assert_eq!(body["data"]["last"]["result"], "success");

    let (status, body) = send(&app, Method::DELETE, "/price-items/srv-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["remote_deleted"], true);
    assert!(remote.records.lock().is_empty());
}

#[tokio::test]
async fn offline_sync_fails_without_touching_local_items() {
    let app = offline_app().await;
    send(&app, Method::POST, "/price-items", Some(json!({"name": "Desk", "price": 10}))).await;

    let (status, body) = send(&app, Method::POST, "/price-items/sync", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "REMOTE_ERROR");

    let (_, body) = send(&app, Method::GET, "/price-items", None).await;
    assert!(body["data"][0]["id"].as_str().unwrap().starts_with("local-"));

    let (_, body) = send(&app, Method::GET, "/price-items/sync", None).await;
    assert_eq!(body["data"]["last"]["result"], "failure");
}

#[tokio::test]
async fn artifacts_bundle_into_projects_and_feed_estimates() {
    let app = offline_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/artifacts",
        Some(json!({"files": [
            {"file_name": "B2-Dallas TX_plan.pdf", "file_size": 10, "file_type": "application/pdf"},
            {"file_name": "A1-Reno NV_quote.xlsx", "file_size": 20, "file_type": "application/vnd.ms-excel"},
            {"file_name": "A1-Reno NV_floor.pdf", "file_size": 30, "file_type": "application/pdf"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][1]["category"], "pricing");

    let (_, body) = send(&app, Method::GET, "/projects?sort=location", None).await;
    assert_eq!(body["data"][0]["project_key"], "B2");
    assert_eq!(body["data"][0]["location"], "Dallas, TX");
    assert_eq!(body["data"][1]["project_key"], "A1");

    let (_, body) = send(&app, Method::GET, "/projects?sort=title&per_page=1", None).await;
    assert_eq!(body["data"][0]["project_key"], "A1");
    assert_eq!(body["pagination"]["total_pages"], 2);

    let (status, body) = send(
        &app,
        Method::POST,
        "/projects/A1/estimates",
        Some(json!({"name": "Reno Depot", "type": "commercial", "budget": 100000})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["bid_estimate"].as_f64(), Some(144000.0));
    assert_eq!(body["data"]["line_items"].as_array().unwrap().len(), 6);
    let estimate_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(&app, Method::GET, "/projects/A1", None).await;
    assert_eq!(body["data"]["bid"]["file_name"], "A1_Bid_Estimate.json");
    let bid_artifact = body["data"]["bid"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::DELETE, &format!("/artifacts/{bid_artifact}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, Method::GET, "/projects/A1", None).await;
    assert!(body["data"]["bid"].is_null());

    let (status, body) = send(&app, Method::GET, &format!("/estimates/{estimate_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["project_id"], "A1");

    let (status, body) = send(
        &app,
        Method::POST,
        "/projects/ZZZ/estimates",
        Some(json!({"type": "residential"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(
        &app,
        Method::POST,
        "/projects/A1/estimates",
        Some(json!({"type": "industrial", "budget": 7e28})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"].as_str().unwrap().contains("budget too large"));

    let (_, body) = send(&app, Method::GET, "/estimates", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = offline_app().await;
    let (status, _) = send(&app, Method::DELETE, "/price-items/local-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/artifacts/00000000-0000-0000-0000-000000000000",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
