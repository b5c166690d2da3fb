use anyhow::Context;
use axum::{http::HeaderValue, middleware::from_fn, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{Settings, SnapshotBackend};
use crate::domain::{BidEstimate, PriceItem, ProjectArtifact};
use crate::middleware::{request_id_layer, stamp_error_bodies, X_REQUEST_ID};
use crate::routes;
use crate::services::store::keys;
use crate::services::{
    ArtifactLibrary, BidEstimator, EstimateBook, EventBus, FileStore, HttpCatalogClient,
    LocalCache, MemoryStore, OfflineCatalog, PriceCatalog, RandomSource, RedisStore,
    RemoteCatalog, SeededRandom, SnapshotStore, ThreadRandom,
};

/// Shared application state
pub struct AppState {
    pub settings: Settings,
    pub store: Arc<dyn SnapshotStore>,
    pub events: EventBus,
    pub catalog: Arc<PriceCatalog>,
    pub library: Arc<ArtifactLibrary>,
    pub estimates: Arc<EstimateBook>,
    /// False when the catalog runs against [`OfflineCatalog`]
    pub remote_configured: bool,
}

impl AppState {
    /// Wire the services over explicit collaborators and load every table.
    pub async fn new(
        settings: Settings,
        store: Arc<dyn SnapshotStore>,
        remote: Arc<dyn RemoteCatalog<PriceItem>>,
        rng: Arc<dyn RandomSource>,
    ) -> Arc<Self> {
        let events = EventBus::new();
        let remote_configured = settings.remote_catalog_url.is_some();

        let catalog = PriceCatalog::load(
            LocalCache::<PriceItem>::new(store.clone(), keys::PRICE_ITEMS, events.clone()),
            remote,
            events.clone(),
        )
        .await;

        let library = Arc::new(
            ArtifactLibrary::load(
                LocalCache::<ProjectArtifact>::new(store.clone(), keys::ARTIFACTS, events.clone()),
                events.clone(),
            )
            .await,
        );

        let estimates = EstimateBook::load(
            LocalCache::<BidEstimate>::new(store.clone(), keys::ESTIMATES, events.clone()),
            library.clone(),
            BidEstimator::new(rng),
            events.clone(),
        )
        .await;

        Arc::new(Self {
            settings,
            store,
            events,
            catalog: Arc::new(catalog),
            library,
            estimates: Arc::new(estimates),
            remote_configured,
        })
    }

    /// Build the collaborators named by `settings` and then the state.
    pub async fn from_settings(settings: Settings) -> anyhow::Result<Arc<Self>> {
        let store: Arc<dyn SnapshotStore> = match &settings.snapshot_backend {
            SnapshotBackend::File(dir) => Arc::new(
                FileStore::open(dir.clone())
                    .await
                    .with_context(|| format!("Failed to open snapshot dir {}", dir.display()))?,
            ),
            SnapshotBackend::Redis(url) => Arc::new(
                RedisStore::connect(url)
                    .await
                    .context("Failed to connect to Redis snapshot store")?,
            ),
            SnapshotBackend::Memory => {
                tracing::warn!("Using in-memory snapshots; nothing survives a restart");
                Arc::new(MemoryStore::new())
            }
        };
        tracing::info!(backend = store.backend(), "Snapshot store ready");

        let remote: Arc<dyn RemoteCatalog<PriceItem>> = match &settings.remote_catalog_url {
            Some(url) => Arc::new(
                HttpCatalogClient::<PriceItem>::new(
                    url,
                    "price-items",
                    &settings.remote_catalog_token,
                    settings.remote_catalog_timeout_seconds,
                )
                .context("Failed to build remote catalog client")?,
            ),
            None => {
                tracing::warn!("REMOTE_CATALOG_URL not set; sync and remote deletes will fail");
                Arc::new(OfflineCatalog)
            }
        };

        let rng: Arc<dyn RandomSource> = match settings.estimate_seed {
            Some(seed) => {
                tracing::info!(seed, "Estimator using seeded randomness");
                Arc::new(SeededRandom::new(seed))
            }
            None => Arc::new(ThreadRandom),
        };

        Ok(Self::new(settings, store, remote, rng).await)
    }
}

/// Build the complete application with all middleware
pub fn create_app(state: Arc<AppState>) -> Router {
    // Build CORS layer
    let cors = build_cors_layer(&state.settings);

    // Build trace layer (use DEBUG for spans to reduce overhead at INFO level)
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::DEBUG));

    // Request ID layers
    let (set_request_id, propagate_request_id) = request_id_layer();

    Router::new()
        .merge(routes::api_router())
        // Middleware stack (applied bottom-up)
        .layer(from_fn(stamp_error_bodies))
        .layer(propagate_request_id)
        .layer(trace_layer)
        .layer(set_request_id)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let max_age = if settings.env.is_dev() {
        std::time::Duration::from_secs(86400)
    } else {
        std::time::Duration::from_secs(3600)
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::list([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PATCH,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::CACHE_CONTROL,
            axum::http::HeaderName::from_static(X_REQUEST_ID),
        ]))
        .max_age(max_age)
}
