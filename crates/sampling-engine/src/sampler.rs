//! Deterministic sampler
//!
//! Materializes a [`Sample`] from a plan. One uniform source is seeded from
//! `config.seed` per call and consumed in a fixed order: strata in plan
//! order, rows in population order within a stratum. Identical
//! (population, config, plan, provenance) inputs give identical samples.

use crate::error::SamplingError;
use crate::rng::{Lcg32, SeededSource, UniformSource};
use crate::sample::{Provenance, Sample, SampledRow};
use crate::summary::{build_summary, SamplingSummary};
use sampling_plan::{partition, Partition, SamplingConfig, SamplingMethod, SamplingPlan};
use sampling_population::Population;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Result of one sampling call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingRun {
    /// Selected rows
    pub sample: Sample,
    /// Plan the sample was drawn for
    pub plan: SamplingPlan,
    /// Audit documentation record
    pub summary: SamplingSummary,
}

/// Sampler over a seedable uniform source
///
/// The source type is part of the sampler's identity: switching it changes
/// which rows a seed selects.
#[derive(Debug, Clone, Copy)]
pub struct Sampler<S = Lcg32> {
    _source: PhantomData<fn() -> S>,
}

impl<S> Default for Sampler<S> {
    fn default() -> Self {
        Self {
            _source: PhantomData,
        }
    }
}

impl<S: SeededSource> Sampler<S> {
    /// Create sampler
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a sample and build its summary
    ///
    /// # Errors
    /// See [`Sampler::select`]
    pub fn sample_data(
        &self,
        population: &Population,
        config: &SamplingConfig,
        plan: &SamplingPlan,
        provenance: Provenance,
    ) -> Result<SamplingRun, SamplingError> {
        let sample = self.select(population, config, plan, provenance)?;
        let summary = build_summary(config, Some(plan), Some(&sample))?;
        Ok(SamplingRun {
            sample,
            plan: plan.clone(),
            summary,
        })
    }

    /// Draw the rows a plan asks for
    ///
    /// # Errors
    /// - Planning errors re-derived from the population and config
    /// - [`SamplingError::InvalidState`] if the plan was not computed for
    ///   this population and config
    pub fn select(
        &self,
        population: &Population,
        config: &SamplingConfig,
        plan: &SamplingPlan,
        provenance: Provenance,
    ) -> Result<Sample, SamplingError> {
        let partition = partition(population, config)?;
        check_plan_matches(plan, config, &partition)?;

        let mut source = S::from_seed(config.seed);
        let mut rows = Vec::with_capacity(plan.planned_size);

        for allocation in &plan.allocations {
            let eligible = partition.indices(&allocation.key).unwrap_or_default();
            let count = allocation.sample_count.min(eligible.len());

            let picked = if config.method.is_systematic() {
                draw_systematic(&mut source, eligible, count)
            } else {
                draw_random(&mut source, eligible, count)
            };

            tracing::debug!(
                stratum = %allocation.key,
                requested = allocation.sample_count,
                selected = picked.len(),
                "sampled stratum"
            );

            rows.extend(picked.into_iter().filter_map(|index| {
                population.row(index).map(|row| SampledRow {
                    index,
                    stratum: allocation.key.clone(),
                    row: row.clone(),
                })
            }));
        }

        let sample = Sample {
            plan_id: plan.id,
            method: config.method,
            seed: config.seed,
            rows,
            config: config.clone(),
            provenance,
            locked_at: None,
        };

        tracing::info!(
            plan = %plan.id,
            method = %config.method,
            seed = config.seed,
            size = sample.sample_size(),
            planned = plan.planned_size,
            "drew sample"
        );

        Ok(sample)
    }
}

/// Draw a sample with the default [`Lcg32`] source
///
/// # Errors
/// See [`Sampler::select`]
pub fn sample_data(
    population: &Population,
    config: &SamplingConfig,
    plan: &SamplingPlan,
    provenance: Provenance,
) -> Result<SamplingRun, SamplingError> {
    Sampler::<Lcg32>::new().sample_data(population, config, plan, provenance)
}

fn check_plan_matches(
    plan: &SamplingPlan,
    config: &SamplingConfig,
    partition: &Partition,
) -> Result<(), SamplingError> {
    if plan.method != config.method {
        return Err(SamplingError::invalid_state(format!(
            "plan {} was computed for method {}, config uses {}",
            plan.id, plan.method, config.method
        )));
    }
    if plan.stratify_fields != config.stratify_fields {
        return Err(SamplingError::invalid_state(format!(
            "plan {} was stratified by {:?}, config uses {:?}",
            plan.id, plan.stratify_fields, config.stratify_fields
        )));
    }

    let matches = plan.stratum_count() == partition.stratum_count()
        && plan.allocations.iter().all(|a| {
            partition
                .indices(&a.key)
                .is_some_and(|rows| rows.len() == a.population_count)
        });
    if !matches {
        return Err(SamplingError::invalid_state(format!(
            "plan {} does not match the population and configuration",
            plan.id
        )));
    }

    Ok(())
}

/// Partial Fisher–Yates over the stratum, result in population order
///
/// Taking the whole stratum (or nothing) consumes no randomness.
fn draw_random<S: UniformSource>(source: &mut S, eligible: &[usize], count: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    if count >= eligible.len() {
        return eligible.to_vec();
    }

    let mut pool = eligible.to_vec();
    let len = pool.len();
    for i in 0..count {
        let j = i + source.next_below(len - i);
        pool.swap(i, j);
    }

    pool.truncate(count);
    pool.sort_unstable();
    pool
}

/// Random start in `[0, k)`, then every k-th row, no wrap-around
///
/// `k = ⌊len / count⌋`, so `start + (count − 1)·k < len` and the stratum
/// always yields `count` rows.
fn draw_systematic<S: UniformSource>(source: &mut S, eligible: &[usize], count: usize) -> Vec<usize> {
    let count = count.min(eligible.len());
    if count == 0 {
        return Vec::new();
    }

    let interval = eligible.len() / count;
    let start = source.next_below(interval);
    eligible
        .iter()
        .skip(start)
        .step_by(interval)
        .take(count)
        .copied()
        .collect()
}
