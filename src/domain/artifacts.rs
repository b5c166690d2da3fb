use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Artifact category enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    Pricing,
    Floorplan,
    Bid,
}

impl Default for ArtifactCategory {
    fn default() -> Self {
        Self::Floorplan
    }
}

impl ArtifactCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pricing => "pricing",
            Self::Floorplan => "floorplan",
            Self::Bid => "bid",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata record for an uploaded file. Never updated, only deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectArtifact {
    pub id: Uuid,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    pub upload_date: DateTime<Utc>,
    pub category: ArtifactCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_location: Option<String>,
}

/// What the upload collaborator hands over. Binary content never gets here.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadedFile {
    pub file_name: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_type: String,
}

/// Request DTO for registering a batch of uploads
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterArtifactsRequest {
    pub files: Vec<UploadedFile>,
}

/// Per-project grouping of at most one artifact per category.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectBundle {
    pub project_key: String,
    pub location: Option<String>,
    pub pricing: Option<ProjectArtifact>,
    pub floorplan: Option<ProjectArtifact>,
    pub bid: Option<ProjectArtifact>,
}

impl ProjectBundle {
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            location: None,
            pricing: None,
            floorplan: None,
            bid: None,
        }
    }

    pub fn slot(&self, category: ArtifactCategory) -> Option<&ProjectArtifact> {
        match category {
            ArtifactCategory::Pricing => self.pricing.as_ref(),
            ArtifactCategory::Floorplan => self.floorplan.as_ref(),
            ArtifactCategory::Bid => self.bid.as_ref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, category: ArtifactCategory) -> &mut Option<ProjectArtifact> {
        match category {
            ArtifactCategory::Pricing => &mut self.pricing,
            ArtifactCategory::Floorplan => &mut self.floorplan,
            ArtifactCategory::Bid => &mut self.bid,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pricing.is_some() && self.floorplan.is_some() && self.bid.is_some()
    }
}

/// Bundle summary used in project listings
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub project_key: String,
    pub location: Option<String>,
    pub has_pricing: bool,
    pub has_floorplan: bool,
    pub has_bid: bool,
}

impl From<&ProjectBundle> for ProjectSummary {
    fn from(b: &ProjectBundle) -> Self {
        Self {
            project_key: b.project_key.clone(),
            location: b.location.clone(),
            has_pricing: b.pricing.is_some(),
            has_floorplan: b.floorplan.is_some(),
            has_bid: b.bid.is_some(),
        }
    }
}
