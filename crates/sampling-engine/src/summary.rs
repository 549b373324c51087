//! Sampling summary
//!
//! Read-only projection of config, plan and sample for audit
//! documentation. Recomputed on demand, never stored on its own.

use crate::error::SamplingError;
use crate::sample::Sample;
use chrono::{DateTime, Utc};
use sampling_plan::{z_score, SamplingConfig, SamplingMethod, SamplingPlan, StratumKey};
use serde::{Deserialize, Serialize};

/// How the sample was selected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMethodSummary {
    /// Selection method
    pub method: SamplingMethod,
    /// Rows actually selected
    pub final_sample_size: usize,
    /// Seed of the selection stream
    pub seed: u64,
    /// Grouping fields
    pub stratify_fields: Vec<String>,
    /// Coverage overrides were applied
    pub coverage_adjusted: bool,
    /// Identifier column, if configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
}

/// Statistical basis of the sample size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingRationale {
    /// Confidence level
    pub confidence_level: f64,
    /// Tolerable error rate (the margin of error)
    pub tolerable_error_rate: f64,
    /// Expected error rate
    pub expected_error_rate: f64,
    /// Two-sided z-score for the confidence level
    pub z_score: f64,
    /// Eligible rows
    pub population_size: usize,
    /// Rows before exclusion
    pub total_rows: usize,
    /// Rows removed by exclusion filters
    pub excluded_count: usize,
    /// Requested count
    pub desired_size: usize,
    /// Allocated count
    pub planned_size: usize,
}

/// One row of the allocation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSummary {
    /// Display label of the stratum
    pub stratum: String,
    /// Stratum identity
    pub key: StratumKey,
    /// Eligible rows in the stratum
    pub population_count: usize,
    /// Units allocated
    pub sample_count: usize,
    /// Units actually drawn
    pub selected_count: usize,
    /// Share of eligible rows
    pub share_of_population: f64,
    /// Raised by the coverage adjuster
    pub coverage_override: bool,
}

/// Audit documentation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingSummary {
    /// How rows were picked
    pub sample_selection_method: SelectionMethodSummary,
    /// Why this many rows
    pub sampling_rationale: SamplingRationale,
    /// Per-stratum allocation table
    pub allocations: Vec<AllocationSummary>,
    /// Lock time, if locked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
    /// Sample content digest
    pub fingerprint: String,
}

/// Build the summary for a sampled plan
///
/// # Errors
/// [`SamplingError::InvalidState`] if the plan or sample is missing, or if
/// the sample was drawn for a different plan
pub fn build_summary(
    config: &SamplingConfig,
    plan: Option<&SamplingPlan>,
    sample: Option<&Sample>,
) -> Result<SamplingSummary, SamplingError> {
    let plan = plan.ok_or_else(|| SamplingError::invalid_state("no plan to summarize"))?;
    let sample = sample.ok_or_else(|| SamplingError::invalid_state("no sample to summarize"))?;
    if !sample.is_bound_to(plan) {
        return Err(SamplingError::invalid_state(format!(
            "sample was drawn for plan {}, not {}",
            sample.plan_id, plan.id
        )));
    }

    let allocations = plan
        .allocations
        .iter()
        .map(|a| AllocationSummary {
            stratum: a.key.to_string(),
            key: a.key.clone(),
            population_count: a.population_count,
            sample_count: a.sample_count,
            selected_count: sample.count_in(&a.key),
            share_of_population: a.share_of_population,
            coverage_override: a.coverage_override,
        })
        .collect();

    Ok(SamplingSummary {
        sample_selection_method: SelectionMethodSummary {
            method: sample.method,
            final_sample_size: sample.sample_size(),
            seed: sample.seed,
            stratify_fields: plan.stratify_fields.clone(),
            coverage_adjusted: plan.coverage_adjusted,
            id_column: config.id_column.clone(),
        },
        sampling_rationale: SamplingRationale {
            confidence_level: config.confidence_level,
            tolerable_error_rate: config.margin_of_error,
            expected_error_rate: config.expected_error_rate,
            z_score: z_score(config.confidence_level)?,
            population_size: plan.population_size,
            total_rows: plan.total_rows,
            excluded_count: plan.excluded_count,
            desired_size: plan.desired_size,
            planned_size: plan.planned_size,
        },
        allocations,
        locked_at: sample.locked_at,
        fingerprint: sample.fingerprint(),
    })
}
