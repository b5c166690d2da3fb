use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Project type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Commercial,
    Residential,
    Industrial,
    Infrastructure,
    Unspecified,
}

impl Default for ProjectType {
    fn default() -> Self {
        Self::Unspecified
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Commercial => "commercial",
            Self::Residential => "residential",
            Self::Industrial => "industrial",
            Self::Infrastructure => "infrastructure",
            Self::Unspecified => "unspecified",
        };
        f.write_str(s)
    }
}

/// Which bucket of the breakdown a line item belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Labor,
    Materials,
    Equipment,
    Overhead,
    Profit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub category: CostCategory,
    pub total: Decimal,
}

/// Estimate entity. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BidEstimate {
    pub id: Uuid,
    pub project_id: String,
    pub project_name: String,
    pub project_type: ProjectType,
    pub bid_estimate: Decimal,
    pub line_items: Vec<LineItem>,
    pub total_labor: Decimal,
    pub total_materials: Decimal,
    pub total_equipment: Decimal,
    pub confidence: u8,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl BidEstimate {
    /// Sum of the line item totals; always equal to `bid_estimate`.
    pub fn line_item_sum(&self) -> Decimal {
        self.line_items.iter().map(|item| item.total).sum()
    }
}

/// Request DTO for generating an estimate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EstimateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type", alias = "project_type")]
    pub project_type: ProjectType,
    #[serde(default)]
    pub budget: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Estimate summary for listings
#[derive(Debug, Clone, Serialize)]
pub struct EstimateSummary {
    pub id: Uuid,
    pub project_id: String,
    pub project_name: String,
    pub bid_estimate: Decimal,
    pub confidence: u8,
    pub created_at: DateTime<Utc>,
}

impl From<&BidEstimate> for EstimateSummary {
    fn from(e: &BidEstimate) -> Self {
        Self {
            id: e.id,
            project_id: e.project_id.clone(),
            project_name: e.project_name.clone(),
            bid_estimate: e.bid_estimate,
            confidence: e.confidence,
            created_at: e.created_at,
        }
    }
}
