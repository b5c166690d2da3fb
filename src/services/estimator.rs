//! Bid estimate calculator.
//!
//! A base amount (the client budget, or a random seed when none is given) is
//! scaled by a project-type factor and split into cost buckets by fixed ratios.
//! The ratios are not normalised: industrial work sums to 1.25.

use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{BidEstimate, CostCategory, EstimateRequest, LineItem, ProjectType, ValidationError};
use crate::services::random::RandomSource;

/// Lower bound of the random base when no budget is supplied
const SEED_MIN: i64 = 75_000;
/// Width of the random base range, `[75000, 125000)`
const SEED_SPAN: i64 = 50_000;

const CONFIDENCE_FLOOR: u8 = 85;
const CONFIDENCE_CEILING: u8 = 94;

const BOILERPLATE_NOTES: &[&str] = &[
    "Estimate derived from standard cost ratios for the project type.",
    "Figures exclude taxes and are subject to site inspection.",
    "Valid for 30 days from the date of generation.",
];

/// Multiplier applied to the base amount.
pub fn type_factor(project_type: ProjectType) -> Decimal {
    match project_type {
        ProjectType::Commercial => Decimal::new(12, 1),
        ProjectType::Residential => Decimal::new(8, 1),
        ProjectType::Industrial => Decimal::new(14, 1),
        ProjectType::Infrastructure => Decimal::new(13, 1),
        ProjectType::Unspecified => Decimal::ONE,
    }
}

/// Share of the scaled base assigned to each cost bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostRatios {
    pub labor: Decimal,
    pub materials: Decimal,
    pub equipment: Decimal,
    pub overhead: Decimal,
    pub profit: Decimal,
}

impl CostRatios {
    pub fn for_type(project_type: ProjectType) -> Self {
        let labor = if project_type == ProjectType::Industrial {
            Decimal::new(50, 2)
        } else {
            Decimal::new(45, 2)
        };
        let materials = if project_type == ProjectType::Residential {
            Decimal::new(30, 2)
        } else {
            Decimal::new(35, 2)
        };

        Self {
            labor,
            materials,
            equipment: Decimal::new(20, 2),
            overhead: Decimal::new(10, 2),
            profit: Decimal::new(10, 2),
        }
    }

    pub fn total(&self) -> Decimal {
        self.labor + self.materials + self.equipment + self.overhead + self.profit
    }
}

/// Unrounded bucket amounts for a scaled base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub base: Decimal,
    pub labor: Decimal,
    pub materials: Decimal,
    pub equipment: Decimal,
    pub overhead: Decimal,
    pub profit: Decimal,
}

fn too_large() -> ValidationError {
    ValidationError::Invalid("budget too large".into())
}

fn scale(amount: Decimal, factor: Decimal) -> Result<Decimal, ValidationError> {
    amount.checked_mul(factor).ok_or_else(too_large)
}

impl CostBreakdown {
    /// Fails when the scaled amounts no longer fit in a `Decimal`.
    pub fn compute(base: Decimal, project_type: ProjectType) -> Result<Self, ValidationError> {
        let base = scale(base, type_factor(project_type))?;
        let ratios = CostRatios::for_type(project_type);
        Ok(Self {
            base,
            labor: scale(base, ratios.labor)?,
            materials: scale(base, ratios.materials)?,
            equipment: scale(base, ratios.equipment)?,
            overhead: scale(base, ratios.overhead)?,
            profit: scale(base, ratios.profit)?,
        })
    }

    /// The six line items, each rounded to cents. Overhead is split 70/30
    /// into project management and insurance & permits.
    pub fn line_items(&self) -> Result<Vec<LineItem>, ValidationError> {
        let management = scale(self.overhead, Decimal::new(7, 1))?;
        let insurance = scale(self.overhead, Decimal::new(3, 1))?;

        Ok(vec![
            line("Labor", CostCategory::Labor, self.labor),
            line("Materials", CostCategory::Materials, self.materials),
            line("Equipment Rental", CostCategory::Equipment, self.equipment),
            line("Project Management", CostCategory::Overhead, management),
            line("Insurance & Permits", CostCategory::Overhead, insurance),
            line("Profit", CostCategory::Profit, self.profit),
        ])
    }
}

fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn line(description: &str, category: CostCategory, amount: Decimal) -> LineItem {
    LineItem {
        description: description.to_string(),
        category,
        total: cents(amount),
    }
}

pub struct BidEstimator {
    rng: Arc<dyn RandomSource>,
}

impl BidEstimator {
    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self { rng }
    }

    /// Build an estimate for `project_id`. The base is drawn before the
    /// confidence so a seeded source replays identically.
    pub fn estimate(
        &self,
        project_id: &str,
        request: &EstimateRequest,
    ) -> Result<BidEstimate, ValidationError> {
        let base = match request.budget {
            Some(budget) if budget < Decimal::ZERO => {
                return Err(ValidationError::Invalid(format!(
                    "budget must not be negative, got {}",
                    budget
                )));
            }
            Some(budget) if !budget.is_zero() => budget,
            _ => self.random_base()?,
        };

        let breakdown = CostBreakdown::compute(base, request.project_type)?;
        let line_items = breakdown.line_items()?;
        let bid_estimate = line_items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total))
            .ok_or_else(too_large)?;

        let roll = (self.rng.next_f64() * 10.0).floor() as u8;
        let confidence = (CONFIDENCE_FLOOR + roll).min(CONFIDENCE_CEILING);

        let mut notes: Vec<String> = BOILERPLATE_NOTES.iter().map(|n| n.to_string()).collect();
        if let Some(note) = request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            notes.push(format!("Client note: {}", note));
        }

        let project_name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(project_id)
            .to_string();

        Ok(BidEstimate {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            project_name,
            project_type: request.project_type,
            bid_estimate,
            total_labor: cents(breakdown.labor),
            total_materials: cents(breakdown.materials),
            total_equipment: cents(breakdown.equipment),
            line_items,
            confidence,
            notes,
            created_at: Utc::now(),
        })
    }

    fn random_base(&self) -> Result<Decimal, ValidationError> {
        let draw = self.rng.next_f64() * SEED_SPAN as f64;
        let offset = Decimal::from_f64(draw)
            .ok_or_else(|| ValidationError::Invalid("random source produced an unusable value".into()))?;
        Ok(cents(Decimal::from(SEED_MIN) + offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::random::{FixedRandom, SeededRandom};

    fn request(project_type: ProjectType, budget: Option<i64>) -> EstimateRequest {
        EstimateRequest {
            name: Some("Riverside Offices".into()),
            project_type,
            budget: budget.map(Decimal::from),
            notes: None,
        }
    }

    fn amount(estimate: &BidEstimate, description: &str) -> Decimal {
        estimate
            .line_items
            .iter()
            .find(|i| i.description == description)
            .map(|i| i.total)
            .unwrap()
    }

    #[test]
    fn commercial_budget_breakdown() {
        let estimator = BidEstimator::new(Arc::new(FixedRandom(0.0)));
        let estimate = estimator
            .estimate("PRJ001", &request(ProjectType::Commercial, Some(100_000)))
            .unwrap();

        assert_eq!(amount(&estimate, "Labor"), Decimal::from(54_000));
        assert_eq!(amount(&estimate, "Materials"), Decimal::from(42_000));
        assert_eq!(amount(&estimate, "Equipment Rental"), Decimal::from(24_000));
        assert_eq!(amount(&estimate, "Project Management"), Decimal::from(8_400));
        assert_eq!(amount(&estimate, "Insurance & Permits"), Decimal::from(3_600));
        assert_eq!(amount(&estimate, "Profit"), Decimal::from(12_000));
        assert_eq!(estimate.bid_estimate, Decimal::new(14_400_000, 2));
        assert_eq!(estimate.line_items.len(), 6);
        assert_eq!(estimate.confidence, 85);
    }

    #[test]
    fn industrial_ratios_are_not_normalised() {
        assert_eq!(CostRatios::for_type(ProjectType::Industrial).total(), Decimal::new(125, 2));
        assert_eq!(CostRatios::for_type(ProjectType::Residential).total(), Decimal::new(105, 2));
        assert_eq!(CostRatios::for_type(ProjectType::Commercial).total(), Decimal::new(120, 2));
    }

    #[test]
    fn total_is_the_exact_sum_of_rounded_lines() {
        let estimator = BidEstimator::new(Arc::new(SeededRandom::new(7)));
        for project_type in [
            ProjectType::Commercial,
            ProjectType::Residential,
            ProjectType::Industrial,
            ProjectType::Infrastructure,
            ProjectType::Unspecified,
        ] {
            let estimate = estimator.estimate("P", &request(project_type, None)).unwrap();
            assert_eq!(estimate.bid_estimate, estimate.line_item_sum());
            assert!(estimate.bid_estimate.scale() <= 2);
            assert!((85..=94).contains(&estimate.confidence));
        }
    }

    #[test]
    fn fixed_source_is_deterministic() {
        let estimator = BidEstimator::new(Arc::new(FixedRandom(0.5)));
        let a = estimator.estimate("P", &request(ProjectType::Unspecified, None)).unwrap();
        let b = estimator.estimate("P", &request(ProjectType::Unspecified, None)).unwrap();

        // base = 75000 + 0.5 * 50000
        assert_eq!(amount(&a, "Labor"), Decimal::from(45_000));
        assert_eq!(a.bid_estimate, b.bid_estimate);
        assert_eq!(a.confidence, 90);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn zero_budget_falls_back_to_seed_and_negative_is_rejected() {
        let estimator = BidEstimator::new(Arc::new(FixedRandom(0.0)));
        let zero = estimator
            .estimate("P", &request(ProjectType::Unspecified, Some(0)))
            .unwrap();
        // 75000 scaled by the unnormalised 1.05 ratio total
        assert_eq!(zero.bid_estimate, Decimal::from(78_750));

        assert!(estimator
            .estimate("P", &request(ProjectType::Unspecified, Some(-5)))
            .is_err());
    }

    #[test]
    fn notes_and_name_fallback() {
        let estimator = BidEstimator::new(Arc::new(FixedRandom(0.0)));
        let estimate = estimator
            .estimate(
                "PRJ9",
                &EstimateRequest {
                    notes: Some("  rush job ".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(estimate.project_name, "PRJ9");
        assert_eq!(estimate.notes.last().map(String::as_str), Some("Client note: rush job"));
        assert_eq!(estimate.notes.len(), BOILERPLATE_NOTES.len() + 1);
    }

    #[test]
    fn oversized_budget_is_rejected_instead_of_overflowing() {
        let estimator = BidEstimator::new(Arc::new(FixedRandom(0.0)));
        let huge = EstimateRequest {
            project_type: ProjectType::Industrial,
            budget: Some(Decimal::from_str_exact("70000000000000000000000000000").unwrap()),
            ..Default::default()
        };

        assert_eq!(
            estimator.estimate("P", &huge).unwrap_err(),
            ValidationError::Invalid("budget too large".into())
        );

        // fits after scaling, but the six lines no longer sum
        let near_limit = EstimateRequest {
            project_type: ProjectType::Unspecified,
            budget: Some(Decimal::MAX),
            ..Default::default()
        };
        assert!(estimator.estimate("P", &near_limit).is_err());
    }
}
