//! Groups classified artifacts into per-project bundles.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::domain::{ProjectArtifact, ProjectBundle};

/// Sort order for bundle listings
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectSort {
    #[default]
    Title,
    Location,
}

/// Group artifacts by project key. Artifacts without a key are skipped, and
/// each category slot keeps the first artifact encountered in input order.
pub fn organize_files_by_project(artifacts: &[ProjectArtifact]) -> BTreeMap<String, ProjectBundle> {
    let mut bundles: BTreeMap<String, ProjectBundle> = BTreeMap::new();

    for artifact in artifacts {
        let Some(key) = artifact.project_key.as_deref() else {
            continue;
        };

        let bundle = bundles
            .entry(key.to_string())
            .or_insert_with(|| ProjectBundle::new(key));

        if bundle.location.is_none() {
            bundle.location = artifact
                .project_location
                .as_ref()
                .filter(|l| !l.trim().is_empty())
                .cloned();
        }

        let slot = bundle.slot_mut(artifact.category);
        if slot.is_none() {
            *slot = Some(artifact.clone());
        }
    }

    bundles
}

/// Same grouping, but the newest upload of each category wins.
pub fn organize_latest_first(artifacts: &[ProjectArtifact]) -> BTreeMap<String, ProjectBundle> {
    let mut ordered: Vec<ProjectArtifact> = artifacts.to_vec();
    // stable: equal timestamps keep input order
    ordered.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
    organize_files_by_project(&ordered)
}

/// Order bundles deterministically. Ties always fall back to the project key,
/// so identical input gives identical output.
pub fn sort_bundles(mut bundles: Vec<ProjectBundle>, sort: ProjectSort) -> Vec<ProjectBundle> {
    match sort {
        ProjectSort::Title => bundles.sort_by(|a, b| a.project_key.cmp(&b.project_key)),
        ProjectSort::Location => bundles.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.project_key.cmp(&b.project_key))
        }),
    }
    bundles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArtifactCategory;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn artifact(
        name: &str,
        category: ArtifactCategory,
        key: Option<&str>,
        location: Option<&str>,
        minutes: i64,
    ) -> ProjectArtifact {
        ProjectArtifact {
            id: Uuid::new_v4(),
            file_name: name.to_string(),
            file_size: 1024,
            file_type: "application/pdf".to_string(),
            upload_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
            category,
            project_key: key.map(str::to_string),
            project_location: location.map(str::to_string),
        }
    }

    #[test]
    fn first_artifact_per_slot_wins() {
        let first = artifact("A1_plan.pdf", ArtifactCategory::Floorplan, Some("A1"), None, 0);
        let second = artifact("A1_plan_v2.pdf", ArtifactCategory::Floorplan, Some("A1"), None, 5);
        let bid = artifact("A1_bid.pdf", ArtifactCategory::Bid, Some("A1"), Some("Reno, NV"), 1);

        let bundles = organize_files_by_project(&[first.clone(), second, bid.clone()]);
        let bundle = &bundles["A1"];
        assert_eq!(bundle.floorplan.as_ref(), Some(&first));
        assert_eq!(bundle.bid.as_ref(), Some(&bid));
        assert_eq!(bundle.pricing, None);
        assert_eq!(bundle.location.as_deref(), Some("Reno, NV"));
    }

    #[test]
    fn skips_artifacts_without_key_and_is_idempotent() {
        let items = vec![
            artifact("_x.pdf", ArtifactCategory::Floorplan, None, None, 0),
            artifact("B2_quote.xlsx", ArtifactCategory::Pricing, Some("B2"), None, 1),
            artifact("A1_plan.pdf", ArtifactCategory::Floorplan, Some("A1"), None, 2),
        ];
        let once = organize_files_by_project(&items);
        let twice = organize_files_by_project(&items);
        assert_eq!(once, twice);
        assert_eq!(once.keys().cloned().collect::<Vec<_>>(), vec!["A1", "B2"]);
    }

    #[test]
    fn latest_first_lets_newer_upload_win() {
        let older = artifact("A1_plan.pdf", ArtifactCategory::Floorplan, Some("A1"), None, 0);
        let newer = artifact("A1_plan_v2.pdf", ArtifactCategory::Floorplan, Some("A1"), None, 10);
        let bundles = organize_latest_first(&[older, newer.clone()]);
        assert_eq!(bundles["A1"].floorplan.as_ref(), Some(&newer));
    }

    #[test]
    fn location_sort_is_total_and_stable() {
        let mk = |key: &str, loc: Option<&str>| {
            let mut b = ProjectBundle::new(key);
            b.location = loc.map(str::to_string);
            b
        };
        let input = vec![
            mk("C", Some("Austin, TX")),
            mk("A", None),
            mk("B", Some("Austin, TX")),
            mk("D", Some("Boise, ID")),
        ];
        let sorted = sort_bundles(input.clone(), ProjectSort::Location);
        let keys: Vec<_> = sorted.iter().map(|b| b.project_key.as_str()).collect();
        assert_eq!(keys, vec!["A", "B", "C", "D"]);

        let mut reversed = input;
        reversed.reverse();
        assert_eq!(sort_bundles(reversed, ProjectSort::Location), sorted);
    }
}
