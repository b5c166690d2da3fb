//! Artifact library: the flat list of uploaded file records and the
//! per-project bundles derived from it.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{EventKind, ProjectArtifact, ProjectBundle, UploadedFile, ValidationError};
use crate::error::{ApiError, ApiResult};
use crate::services::aggregator::{organize_files_by_project, sort_bundles, ProjectSort};
use crate::services::classifier::classify;
use crate::services::events::EventBus;
use crate::services::local_cache::LocalCache;

pub struct ArtifactLibrary {
    cache: LocalCache<ProjectArtifact>,
    artifacts: Mutex<Vec<ProjectArtifact>>,
    events: EventBus,
}

impl ArtifactLibrary {
    pub async fn load(cache: LocalCache<ProjectArtifact>, events: EventBus) -> Self {
        let artifacts = cache.read().await;
        info!(count = artifacts.len(), "Artifact library loaded");
        Self {
            cache,
            artifacts: Mutex::new(artifacts),
            events,
        }
    }

    /// All artifacts in upload order.
    pub async fn list(&self) -> Vec<ProjectArtifact> {
        self.artifacts.lock().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<ProjectArtifact> {
        self.artifacts
            .lock()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Artifact '{}' not found", id)))
    }

    /// Classify and record a batch of uploads. The batch lands in one
    /// snapshot write, so either every file is registered or none is.
    #[instrument(skip(self, files), fields(count = files.len()))]
    pub async fn register(&self, files: Vec<UploadedFile>) -> ApiResult<Vec<ProjectArtifact>> {
        if files.is_empty() {
            return Err(ApiError::bad_request("No files to register"));
        }
        if let Some(bad) = files.iter().find(|f| f.file_name.trim().is_empty()) {
            return Err(ValidationError::Invalid(format!(
                "file name must not be empty (size {})",
                bad.file_size
            ))
            .into());
        }

        let now = Utc::now();
        let added: Vec<ProjectArtifact> = files
            .into_iter()
            .map(|file| {
                let file_name = file.file_name.trim().to_string();
                let classification = classify(&file_name);
                ProjectArtifact {
                    id: Uuid::new_v4(),
                    file_name,
                    file_size: file.file_size,
                    file_type: file.file_type,
                    upload_date: now,
                    category: classification.category,
                    project_key: classification.project_key,
                    project_location: classification.project_location,
                }
            })
            .collect();

        let mut artifacts = self.artifacts.lock().await;
        let mut next = artifacts.clone();
        next.extend(added.iter().cloned());
        self.cache.write(&next).await?;
        *artifacts = next;

        for artifact in &added {
            self.events.publish(
                EventKind::Created,
                self.cache.table(),
                format!("{} ({})", artifact.file_name, artifact.category),
            );
        }
        info!(count = added.len(), "Artifacts registered");
        Ok(added)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> ApiResult<ProjectArtifact> {
        let mut artifacts = self.artifacts.lock().await;
        let index = artifacts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Artifact '{}' not found", id)))?;

        let mut next = artifacts.clone();
        let removed = next.remove(index);
        self.cache.write(&next).await?;
        *artifacts = next;

        self.events.publish(
            EventKind::Deleted,
            self.cache.table(),
            format!("{} ({})", removed.file_name, removed.id),
        );
        Ok(removed)
    }

    /// Append one artifact, writing it together with snapshots of other
    /// tables. Nothing changes here unless the whole write lands.
    pub(crate) async fn insert_with(
        &self,
        artifact: ProjectArtifact,
        others: Vec<(String, String)>,
    ) -> ApiResult<()> {
        let mut artifacts = self.artifacts.lock().await;
        let mut next = artifacts.clone();
        next.push(artifact);
        self.cache.write_with(&next, others).await?;
        *artifacts = next;
        Ok(())
    }

    pub async fn bundles(&self, sort: ProjectSort) -> Vec<ProjectBundle> {
        let artifacts = self.artifacts.lock().await;
        let grouped = organize_files_by_project(&artifacts);
        sort_bundles(grouped.into_values().collect(), sort)
    }

    pub async fn bundle(&self, project_key: &str) -> ApiResult<ProjectBundle> {
        let artifacts = self.artifacts.lock().await;
        organize_files_by_project(&artifacts)
            .remove(project_key)
            .ok_or_else(|| ApiError::not_found(format!("Project '{}' not found", project_key)))
    }
}
