//! Plan value types
//!
//! A [`SamplingPlan`] says how many units to draw from which stratum before
//! anything is drawn. Plans are values: recomputing produces a new plan and
//! never touches one a caller already holds.

use crate::config::SamplingMethod;
use crate::stratum::StratumKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique plan identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub Uuid);

impl PlanId {
    /// Generate new plan ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Units assigned to one stratum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Stratum identity
    pub key: StratumKey,
    /// Eligible rows in the stratum
    pub population_count: usize,
    /// Units to draw, never above `population_count`
    pub sample_count: usize,
    /// `population_count` / eligible rows
    pub share_of_population: f64,
    /// Raised to one by the coverage adjuster
    #[serde(default)]
    pub coverage_override: bool,
}

impl Allocation {
    /// Create allocation, clamping the sample count to the population
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(key: StratumKey, population_count: usize, sample_count: usize, eligible: usize) -> Self {
        let share_of_population = if eligible == 0 {
            0.0
        } else {
            population_count as f64 / eligible as f64
        };
        Self {
            key,
            population_count,
            sample_count: sample_count.min(population_count),
            share_of_population,
            coverage_override: false,
        }
    }

    /// Check if the stratum has rows but no units
    #[inline]
    #[must_use]
    pub fn is_starved(&self) -> bool {
        self.population_count > 0 && self.sample_count == 0
    }
}

/// Complete blueprint of a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingPlan {
    /// Plan identity, kept across coverage adjustment
    pub id: PlanId,
    /// Selection method the plan was sized for
    pub method: SamplingMethod,
    /// Allocations in stratum first-appearance order
    pub allocations: Vec<Allocation>,
    /// Originally requested count
    pub desired_size: usize,
    /// Sum of allocation sample counts
    pub planned_size: usize,
    /// Eligible rows (after exclusion)
    pub population_size: usize,
    /// Rows before exclusion
    pub total_rows: usize,
    /// Rows removed by exclusion filters
    pub excluded_count: usize,
    /// Grouping fields
    pub stratify_fields: Vec<String>,
    /// Coverage adjuster has been applied
    #[serde(default)]
    pub coverage_adjusted: bool,
    /// When the plan was computed
    pub created_at: DateTime<Utc>,
}

impl SamplingPlan {
    /// Allocation for a stratum
    #[must_use]
    pub fn allocation(&self, key: &StratumKey) -> Option<&Allocation> {
        self.allocations.iter().find(|a| &a.key == key)
    }

    /// Number of strata
    #[inline]
    #[must_use]
    pub fn stratum_count(&self) -> usize {
        self.allocations.len()
    }

    /// Sum of allocation sample counts
    #[must_use]
    pub fn allocated_total(&self) -> usize {
        self.allocations.iter().map(|a| a.sample_count).sum()
    }

    /// Check that `planned_size` matches the allocations
    #[inline]
    #[must_use]
    pub fn is_conserved(&self) -> bool {
        self.allocated_total() == self.planned_size
    }

    /// Re-derive `planned_size` from the allocations
    pub(crate) fn recompute_totals(&mut self) {
        self.planned_size = self.allocated_total();
    }
}
