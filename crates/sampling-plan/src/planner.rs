//! Stratification planner
//!
//! Turns a population and a configuration into a [`SamplingPlan`]:
//! 1. Exclusion filters produce the eligible set
//! 2. Desired size: override, else percentage, else calculated
//! 3. Eligible rows are grouped into strata by first appearance
//! 4. Desired size is split with the largest-remainder method

use crate::calculator::SampleSizeRequest;
use crate::config::{SamplingConfig, SamplingMethod};
use crate::error::PlanError;
use crate::plan::{Allocation, PlanId, SamplingPlan};
use crate::stratum::StratumKey;
use chrono::Utc;
use indexmap::IndexMap;
use sampling_population::{is_excluded, Population};

/// Eligible rows grouped by stratum
///
/// Row positions refer to the source population and are in population
/// order within each stratum. Strata are in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    strata: IndexMap<StratumKey, Vec<usize>>,
    total_rows: usize,
    excluded_count: usize,
}

impl Partition {
    /// Eligible row positions for a stratum
    #[must_use]
    pub fn indices(&self, key: &StratumKey) -> Option<&[usize]> {
        self.strata.get(key).map(Vec::as_slice)
    }

    /// Iterate strata in first-appearance order
    pub fn strata(&self) -> impl Iterator<Item = (&StratumKey, &[usize])> {
        self.strata.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of strata
    #[inline]
    #[must_use]
    pub fn stratum_count(&self) -> usize {
        self.strata.len()
    }

    /// Rows that survived exclusion
    #[must_use]
    pub fn eligible_count(&self) -> usize {
        self.strata.values().map(Vec::len).sum()
    }

    /// Rows before exclusion
    #[inline]
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// Rows removed by exclusion
    #[inline]
    #[must_use]
    pub fn excluded_count(&self) -> usize {
        self.excluded_count
    }
}

/// Filter and group eligible rows
///
/// # Errors
/// - [`PlanError::EmptyPopulation`] if there are no rows
/// - [`PlanError::InvalidConfiguration`] for a bad configuration
/// - [`PlanError::EmptyEligibleSet`] if the filters remove every row
pub fn partition(population: &Population, config: &SamplingConfig) -> Result<Partition, PlanError> {
    if population.is_empty() {
        return Err(PlanError::EmptyPopulation);
    }
    config.validate(population.columns())?;

    let mut strata: IndexMap<StratumKey, Vec<usize>> = IndexMap::new();
    let mut excluded_count = 0;

    for (index, row) in population.rows().iter().enumerate() {
        if is_excluded(row, &config.exclusions) {
            excluded_count += 1;
            continue;
        }
        strata
            .entry(StratumKey::from_row(row, &config.stratify_fields))
            .or_default()
            .push(index);
    }

    if strata.is_empty() {
        return Err(PlanError::EmptyEligibleSet {
            excluded: excluded_count,
        });
    }

    Ok(Partition {
        strata,
        total_rows: population.len(),
        excluded_count,
    })
}

/// Total units requested for an eligible set
///
/// # Errors
/// [`PlanError::InvalidConfiguration`] for bad statistical parameters
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn desired_size(config: &SamplingConfig, eligible: usize) -> Result<usize, PlanError> {
    config.validate_parameters()?;

    if let Some(size) = config.sample_size_override {
        return Ok(size);
    }

    if config.method == SamplingMethod::Percentage {
        let percentage = config.sample_percentage.ok_or_else(|| {
            PlanError::invalid("percentage method requires a sample percentage")
        })?;
        let raw = eligible as f64 * percentage / 100.0;
        return Ok((raw - 1e-9).ceil().max(0.0) as usize);
    }

    SampleSizeRequest::new(eligible, config.confidence_level, config.margin_of_error)
        .with_expected_error_rate(config.expected_error_rate)
        .with_conservative(config.conservative)
        .calculate()
}

/// Split `desired` units across strata proportionally (largest remainder)
///
/// Floors of the exact quotas are handed out first; the leftover units go
/// one each to the largest fractional remainders, ties to the earlier
/// stratum. Computed in integers, so the result sums to exactly
/// `min(desired, sum(counts))` and never exceeds a stratum's count.
#[must_use]
pub fn largest_remainder(desired: usize, counts: &[usize]) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }
    if desired >= total {
        return counts.to_vec();
    }

    let desired_wide = desired as u128;
    let total_wide = total as u128;

    let mut allocation = Vec::with_capacity(counts.len());
    let mut remainders = Vec::with_capacity(counts.len());
    for (position, &count) in counts.iter().enumerate() {
        let quota = desired_wide * count as u128;
        #[allow(clippy::cast_possible_truncation)]
        allocation.push((quota / total_wide) as usize);
        remainders.push((quota % total_wide, position));
    }

    // largest remainder first, stable on first appearance
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let mut leftover = desired - allocation.iter().sum::<usize>();
    for (_, position) in remainders {
        if leftover == 0 {
            break;
        }
        if allocation[position] < counts[position] {
            allocation[position] += 1;
            leftover -= 1;
        }
    }

    allocation
}

/// Compute a fresh plan
///
/// # Errors
/// See [`partition`] and [`desired_size`]
pub fn compute_plan(population: &Population, config: &SamplingConfig) -> Result<SamplingPlan, PlanError> {
    let partition = partition(population, config)?;
    plan_from_partition(&partition, config)
}

/// Compute a plan for an already-derived partition
///
/// # Errors
/// See [`desired_size`]
pub fn plan_from_partition(
    partition: &Partition,
    config: &SamplingConfig,
) -> Result<SamplingPlan, PlanError> {
    let eligible = partition.eligible_count();
    let desired = desired_size(config, eligible)?;

    let counts: Vec<usize> = partition.strata().map(|(_, rows)| rows.len()).collect();
    let units = largest_remainder(desired, &counts);

    let allocations: Vec<Allocation> = partition
        .strata()
        .zip(units)
        .map(|((key, rows), units)| {
            tracing::debug!(
                stratum = %key,
                population = rows.len(),
                sample = units,
                "allocated stratum"
            );
            Allocation::new(key.clone(), rows.len(), units, eligible)
        })
        .collect();

    let mut plan = SamplingPlan {
        id: PlanId::new(),
        method: config.method,
        allocations,
        desired_size: desired,
        planned_size: 0,
        population_size: eligible,
        total_rows: partition.total_rows(),
        excluded_count: partition.excluded_count(),
        stratify_fields: config.stratify_fields.clone(),
        coverage_adjusted: false,
        created_at: Utc::now(),
    };
    plan.recompute_totals();

    tracing::info!(
        plan = %plan.id,
        method = %plan.method,
        strata = plan.stratum_count(),
        eligible,
        desired,
        planned = plan.planned_size,
        "computed sampling plan"
    );

    Ok(plan)
}
