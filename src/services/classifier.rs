//! Filename heuristics for uploaded artifacts.
//!
//! Everything here is pure: a filename goes in, a category and the project
//! hints encoded in the name come out.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::domain::ArtifactCategory;

const PRICING_CUES: &[&str] = &["price", "cost", "quote"];
const PRICING_EXTENSIONS: &[&str] = &[".xlsx", ".xls", ".csv"];
const FLOORPLAN_CUES: &[&str] = &["floor", "plan", "blueprint", "drawing"];
const BID_CUES: &[&str] = &["bid", "proposal", "contract"];

static PROJECT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9]+)").expect("valid project key regex"));

static LOCATION_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\s*([^_\-]+)").expect("valid location regex"));

static REGION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?\S)[,\s]+([A-Z]{2})$").expect("valid region regex"));

/// Everything the classifier can tell from a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: ArtifactCategory,
    pub project_key: Option<String>,
    pub project_location: Option<String>,
}

pub fn classify(file_name: &str) -> Classification {
    Classification {
        category: detect_file_category(file_name),
        project_key: extract_project_key(file_name),
        project_location: extract_project_location(file_name),
    }
}

/// Category by lowercase substring match. Pricing cues win over floorplan cues,
/// which win over bid cues; anything unrecognised is a floorplan.
pub fn detect_file_category(file_name: &str) -> ArtifactCategory {
    let name = file_name.to_lowercase();
    let has_any = |cues: &[&str]| cues.iter().any(|cue| name.contains(cue));

    if has_any(PRICING_CUES) || PRICING_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        ArtifactCategory::Pricing
    } else if has_any(FLOORPLAN_CUES) {
        ArtifactCategory::Floorplan
    } else if has_any(BID_CUES) {
        ArtifactCategory::Bid
    } else {
        ArtifactCategory::Floorplan
    }
}

/// Leading alphanumeric token, e.g. `PRJ001` in `PRJ001-Austin_plan.pdf`.
pub fn extract_project_key(file_name: &str) -> Option<String> {
    PROJECT_KEY
        .captures(file_name.trim())
        .map(|caps| caps[1].to_string())
}

/// Text after the first hyphen of the stem, up to the next `_` or `-`.
/// A trailing upper-case two-letter region code is normalised to `City, RG`.
pub fn extract_project_location(file_name: &str) -> Option<String> {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };

    let segment = LOCATION_SEGMENT.captures(stem)?.get(1)?.as_str().trim();
    if segment.is_empty() {
        return None;
    }

    match REGION_SUFFIX.captures(segment) {
        Some(caps) => {
            let city = caps[1].trim_end_matches(',').trim();
            Some(format!("{}, {}", city, &caps[2]))
        }
        None => Some(segment.to_string()),
    }
}
