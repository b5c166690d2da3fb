//! Generated bid estimates and their persistence.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{ArtifactCategory, BidEstimate, EstimateRequest, EventKind, ProjectArtifact};
use crate::error::{ApiError, ApiResult};
use crate::services::artifacts::ArtifactLibrary;
use crate::services::estimator::BidEstimator;
use crate::services::events::EventBus;
use crate::services::local_cache::LocalCache;

pub struct EstimateBook {
    cache: LocalCache<BidEstimate>,
    estimates: Mutex<Vec<BidEstimate>>,
    library: Arc<ArtifactLibrary>,
    estimator: BidEstimator,
    events: EventBus,
}

impl EstimateBook {
    pub async fn load(
        cache: LocalCache<BidEstimate>,
        library: Arc<ArtifactLibrary>,
        estimator: BidEstimator,
        events: EventBus,
    ) -> Self {
        let estimates = cache.read().await;
        info!(count = estimates.len(), "Estimate book loaded");
        Self {
            cache,
            estimates: Mutex::new(estimates),
            library,
            estimator,
            events,
        }
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<BidEstimate> {
        let mut estimates = self.estimates.lock().await.clone();
        estimates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        estimates
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<BidEstimate> {
        self.estimates
            .lock()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Estimate '{}' not found", id)))
    }

    /// Estimate an existing project and persist the estimate together with a
    /// synthetic `bid` artifact for it. Both tables are written as one unit.
    #[instrument(skip(self, request))]
    pub async fn generate(&self, project_key: &str, request: &EstimateRequest) -> ApiResult<BidEstimate> {
        let bundle = self.library.bundle(project_key).await?;
        let estimate = self.estimator.estimate(project_key, request)?;

        let body = serde_json::to_string(&estimate)
            .map_err(|e| ApiError::internal(format!("Failed to encode estimate: {}", e)))?;
        let artifact = ProjectArtifact {
            id: Uuid::new_v4(),
            file_name: format!("{}_Bid_Estimate.json", project_key),
            file_size: body.len() as u64,
            file_type: "application/json".to_string(),
            upload_date: Utc::now(),
            category: ArtifactCategory::Bid,
            project_key: Some(project_key.to_string()),
            project_location: bundle.location.clone(),
        };

        let mut estimates = self.estimates.lock().await;
        let mut next = estimates.clone();
        next.push(estimate.clone());
        let encoded = self.cache.encode(&next)?;
        self.library.insert_with(artifact, vec![encoded]).await?;
        *estimates = next;

        info!(
            id = %estimate.id,
            project = project_key,
            bid_estimate = %estimate.bid_estimate,
            confidence = estimate.confidence,
            "Bid estimate generated"
        );
        self.events.publish(
            EventKind::Created,
            self.cache.table(),
            format!("{} estimate {}", project_key, estimate.bid_estimate),
        );
        Ok(estimate)
    }
}
