//! Plan/sample lifecycle
//!
//! [`LifecycleManager`] owns the slot transitions: plans can be recomputed
//! and samples redrawn until the slot is locked, after which every mutation
//! fails with [`SamplingError::AlreadyLocked`].
//!
//! Expensive work (planning, drawing) happens outside the store; the result
//! is committed under the slot's lock only if the slot still matches what
//! the work was based on.

use crate::error::SamplingError;
use crate::rng::{Lcg32, SeededSource};
use crate::sample::{Provenance, Sample};
use crate::sampler::{Sampler, SamplingRun};
use crate::state_machine::{validate_transition, LifecycleState};
use crate::store::{InMemorySlotStore, LockReceipt, SlotId, SlotRecord, SlotStore};
use crate::summary::{build_summary, SamplingSummary};
use chrono::Utc;
use sampling_plan::{PlanId, SamplingConfig, SamplingPlan};
use sampling_population::Population;

/// Drives slots through `Unconfigured → Planned → Sampled → Locked`
#[derive(Debug)]
pub struct LifecycleManager<S: SlotStore = InMemorySlotStore, R: SeededSource = Lcg32> {
    store: S,
    sampler: Sampler<R>,
}

impl LifecycleManager {
    /// Create manager over an in-memory store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(InMemorySlotStore::new())
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SlotStore, R: SeededSource> LifecycleManager<S, R> {
    /// Create manager over an existing store
    #[inline]
    #[must_use]
    pub fn with_store(store: S) -> Self {
        Self {
            store,
            sampler: Sampler::new(),
        }
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create an unconfigured slot
    ///
    /// # Errors
    /// Store errors
    pub fn open_slot(&self) -> Result<SlotId, SamplingError> {
        let slot = SlotId::new();
        self.store.put(SlotRecord::new(slot, Utc::now()))?;
        tracing::debug!(%slot, "opened slot");
        Ok(slot)
    }

    /// Current lifecycle state
    ///
    /// # Errors
    /// [`SamplingError::InvalidState`] for an unknown slot
    pub fn state(&self, slot: SlotId) -> Result<LifecycleState, SamplingError> {
        Ok(self.record(slot)?.state)
    }

    /// Current plan, if any
    ///
    /// # Errors
    /// [`SamplingError::InvalidState`] for an unknown slot
    pub fn plan(&self, slot: SlotId) -> Result<Option<SamplingPlan>, SamplingError> {
        Ok(self.record(slot)?.plan)
    }

    /// Current config, if any
    ///
    /// # Errors
    /// [`SamplingError::InvalidState`] for an unknown slot
    pub fn config(&self, slot: SlotId) -> Result<Option<SamplingConfig>, SamplingError> {
        Ok(self.record(slot)?.config)
    }

    /// Current sample, if any
    ///
    /// # Errors
    /// [`SamplingError::InvalidState`] for an unknown slot
    pub fn sample(&self, slot: SlotId) -> Result<Option<Sample>, SamplingError> {
        Ok(self.record(slot)?.sample)
    }

    /// Ids of superseded plans, oldest first
    ///
    /// # Errors
    /// [`SamplingError::InvalidState`] for an unknown slot
    pub fn history(&self, slot: SlotId) -> Result<Vec<PlanId>, SamplingError> {
        Ok(self.record(slot)?.history)
    }

    /// Audit summary of the current sample
    ///
    /// # Errors
    /// [`SamplingError::InvalidState`] if the slot has not been sampled
    pub fn summary(&self, slot: SlotId) -> Result<SamplingSummary, SamplingError> {
        let record = self.record(slot)?;
        let config = record
            .config
            .as_ref()
            .ok_or_else(|| SamplingError::invalid_state(format!("slot {slot} has no configuration")))?;
        build_summary(config, record.plan.as_ref(), record.sample.as_ref())
    }

    /// Compute a plan and make it the slot's current plan
    ///
    /// A previous plan moves to the history; a previous sample is
    /// discarded.
    ///
    /// # Errors
    /// - [`SamplingError::AlreadyLocked`] if the slot is locked
    /// - Planning errors; the slot is unchanged
    pub fn compute_plan(
        &self,
        slot: SlotId,
        population: &Population,
        config: SamplingConfig,
    ) -> Result<SamplingPlan, SamplingError> {
        transition(slot, self.state(slot)?, LifecycleState::Planned)?;
        let plan = sampling_plan::compute_plan(population, &config)?;

        self.store.update(slot, |record| {
            transition(slot, record.state, LifecycleState::Planned)?;
            if let Some(previous) = record.plan.take() {
                record.history.push(previous.id);
            }
            record.config = Some(config);
            record.plan = Some(plan.clone());
            record.sample = None;
            record.state = LifecycleState::Planned;
            record.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(
            %slot,
            plan = %plan.id,
            planned = plan.planned_size,
            strata = plan.stratum_count(),
            "plan committed"
        );
        Ok(plan)
    }

    /// Give every non-empty stratum of the current plan at least one unit
    ///
    /// The existing sample survives only if no allocation changed.
    ///
    /// # Errors
    /// - [`SamplingError::InvalidState`] if the slot has no plan
    /// - [`SamplingError::AlreadyLocked`] if the slot is locked
    pub fn add_coverage_overrides(&self, slot: SlotId) -> Result<SamplingPlan, SamplingError> {
        let adjusted = self.store.update(slot, |record| {
            let current = record
                .plan
                .as_ref()
                .ok_or_else(|| SamplingError::invalid_state(format!("slot {slot} has no plan")))?;
            let adjusted = sampling_plan::add_coverage_overrides(current);

            if adjusted.allocations != current.allocations {
                transition(slot, record.state, LifecycleState::Planned)?;
                record.sample = None;
                record.state = LifecycleState::Planned;
            }
            record.plan = Some(adjusted.clone());
            record.updated_at = Utc::now();
            Ok(adjusted)
        })?;

        tracing::info!(
            %slot,
            plan = %adjusted.id,
            planned = adjusted.planned_size,
            "coverage overrides applied"
        );
        Ok(adjusted)
    }

    /// Draw a sample for the current plan
    ///
    /// Replaces any earlier sample of the slot.
    ///
    /// # Errors
    /// - [`SamplingError::InvalidState`] if the slot has no plan, or the plan
    ///   changed while the sample was drawn
    /// - [`SamplingError::AlreadyLocked`] if the slot is locked
    /// - Sampler errors; the slot is unchanged
    pub fn run_sampling(
        &self,
        slot: SlotId,
        population: &Population,
        provenance: Provenance,
    ) -> Result<SamplingRun, SamplingError> {
        let record = self.record(slot)?;
        transition(slot, record.state, LifecycleState::Sampled)?;
        let (Some(config), Some(plan)) = (record.config, record.plan) else {
            return Err(SamplingError::invalid_state(format!("slot {slot} has no plan")));
        };

        let run = self.sampler.sample_data(population, &config, &plan, provenance)?;

        self.store.update(slot, |record| {
            transition(slot, record.state, LifecycleState::Sampled)?;
            if record.plan.as_ref() != Some(&run.plan) {
                return Err(SamplingError::invalid_state(format!(
                    "plan of slot {slot} changed while sampling"
                )));
            }
            record.sample = Some(run.sample.clone());
            record.state = LifecycleState::Sampled;
            record.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(
            %slot,
            plan = %run.plan.id,
            size = run.sample.sample_size(),
            fingerprint = %run.summary.fingerprint,
            "sample committed"
        );
        Ok(run)
    }

    /// Freeze the current sample
    ///
    /// Exactly one of any number of concurrent callers succeeds.
    ///
    /// # Errors
    /// - [`SamplingError::InvalidState`] if the slot has no sample
    /// - [`SamplingError::AlreadyLocked`] if the slot is locked
    pub fn lock(&self, slot: SlotId) -> Result<LockReceipt, SamplingError> {
        transition(slot, self.state(slot)?, LifecycleState::Locked)?;
        let receipt = self.store.compare_and_set_lock(slot, Utc::now())?;

        tracing::info!(
            %slot,
            plan = %receipt.plan_id,
            fingerprint = %receipt.fingerprint,
            "sample locked"
        );
        Ok(receipt)
    }

    fn record(&self, slot: SlotId) -> Result<SlotRecord, SamplingError> {
        self.store
            .get(slot)
            .ok_or_else(|| SamplingError::invalid_state(format!("unknown slot {slot}")))
    }
}

fn transition(slot: SlotId, from: LifecycleState, to: LifecycleState) -> Result<(), SamplingError> {
    validate_transition(from, to).map_err(|err| {
        if from == LifecycleState::Locked {
            SamplingError::AlreadyLocked { slot }
        } else {
            SamplingError::invalid_state(err.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sampling_population::Row;

    fn population() -> Population {
        (0..1_000)
            .map(|i| {
                Row::new()
                    .with("id", i)
                    .with("Country", if i < 997 { "US" } else { "UK" })
            })
            .collect()
    }

    fn config() -> SamplingConfig {
        SamplingConfig::new()
            .with_sample_size(100)
            .with_stratify_fields(["Country"])
    }

    #[test]
    fn new_slot_is_unconfigured() {
        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        assert_eq!(manager.state(slot).unwrap(), LifecycleState::Unconfigured);
        assert!(manager.plan(slot).unwrap().is_none());
        assert!(manager.summary(slot).is_err());
    }

    #[test]
    fn sampling_before_planning_is_invalid_state() {
        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        let result = manager.run_sampling(slot, &population(), Provenance::now());
        assert!(matches!(result, Err(SamplingError::InvalidState(_))));
    }

    #[test]
    fn failed_plan_leaves_slot_unchanged() {
        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        let result = manager.compute_plan(slot, &population(), config().with_stratify_fields(["Region"]));
        assert!(matches!(result, Err(SamplingError::InvalidConfiguration(_))));
        assert_eq!(manager.state(slot).unwrap(), LifecycleState::Unconfigured);
    }

    #[test]
    fn coverage_change_discards_sample() {
        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        manager.compute_plan(slot, &population(), config()).unwrap();
        manager.run_sampling(slot, &population(), Provenance::now()).unwrap();

        let adjusted = manager.add_coverage_overrides(slot).unwrap();
        assert_eq!(adjusted.planned_size, 101);
        assert_eq!(manager.state(slot).unwrap(), LifecycleState::Planned);
        assert!(manager.sample(slot).unwrap().is_none());
    }

    #[test]
    fn coverage_noop_keeps_sample() {
        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        let balanced: Population = (0..1_000)
            .map(|i| Row::new().with("Country", if i % 2 == 0 { "US" } else { "UK" }))
            .collect();
        manager.compute_plan(slot, &balanced, config()).unwrap();
        manager.run_sampling(slot, &balanced, Provenance::now()).unwrap();

        manager.add_coverage_overrides(slot).unwrap();
        assert_eq!(manager.state(slot).unwrap(), LifecycleState::Sampled);
        assert!(manager.summary(slot).is_ok());
    }

    #[test]
    fn replanning_records_history() {
        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        let first = manager.compute_plan(slot, &population(), config()).unwrap();
        manager.run_sampling(slot, &population(), Provenance::now()).unwrap();
        let second = manager
            .compute_plan(slot, &population(), config().with_sample_size(50))
            .unwrap();

        assert_eq!(manager.history(slot).unwrap(), vec![first.id]);
        assert_eq!(manager.plan(slot).unwrap().map(|p| p.id), Some(second.id));
        assert!(manager.sample(slot).unwrap().is_none());
    }

    #[test]
    fn unknown_slot_is_invalid_state() {
        let manager = LifecycleManager::new();
        assert!(matches!(
            manager.state(SlotId::new()),
            Err(SamplingError::InvalidState(_))
        ));
    }
}
