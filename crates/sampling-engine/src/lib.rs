//! Sampling Engine
//!
//! Turns a plan into evidence: deterministic row selection, the audit
//! summary, and the slot lifecycle that ends in an irreversible lock.
//!
//! # Core Concepts
//!
//! - [`Sampler`]: Seeded, reproducible random or systematic selection
//! - [`Sample`]: Selected rows plus config, provenance and fingerprint
//! - [`SamplingSummary`]: Method, rationale and allocation table for the file
//! - [`LifecycleManager`]: `Unconfigured → Planned → Sampled → Locked`
//! - [`SlotStore`]: Atomic per-slot storage with compare-and-set locking
//!
//! # Example
//!
//! ```rust
//! use sampling_engine::{LifecycleManager, LifecycleState, Provenance};
//! use sampling_plan::SamplingConfig;
//! use sampling_population::{Population, Row};
//!
//! let population: Population = (0..1_000)
//!     .map(|i| Row::new().with("id", i).with("Country", if i < 900 { "US" } else { "UK" }))
//!     .collect();
//!
//! let manager = LifecycleManager::new();
//! let slot = manager.open_slot()?;
//!
//! let config = SamplingConfig::new()
//!     .with_sample_size(100)
//!     .with_stratify_fields(["Country"])
//!     .with_seed(42);
//! manager.compute_plan(slot, &population, config)?;
//!
//! let run = manager.run_sampling(slot, &population, Provenance::now())?;
//! assert_eq!(run.sample.sample_size(), 100);
//!
//! let receipt = manager.lock(slot)?;
//! assert_eq!(receipt.fingerprint, run.sample.fingerprint());
//! assert_eq!(manager.state(slot)?, LifecycleState::Locked);
//! assert!(manager.lock(slot).unwrap_err().is_already_locked());
//! # Ok::<(), sampling_engine::SamplingError>(())
//! ```

#![warn(unreachable_pub)]

mod error;
mod lifecycle;
mod rng;
mod sample;
mod sampler;
mod state_machine;
mod store;
mod summary;

// Re-exports
pub use error::{ErrorKind, SamplingError};
pub use lifecycle::LifecycleManager;
pub use rng::{Lcg32, RandSource, SeededSource, StdRandSource, UniformSource};
pub use sample::{Provenance, Sample, SampledRow};
pub use sampler::{sample_data, Sampler, SamplingRun};
pub use state_machine::{allowed_transitions, validate_transition, LifecycleState, TransitionError};
pub use store::{InMemorySlotStore, LockReceipt, SlotId, SlotRecord, SlotStore};
pub use summary::{
    build_summary, AllocationSummary, SamplingRationale, SamplingSummary, SelectionMethodSummary,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use sampling_plan::{compute_plan, SamplingConfig, SamplingMethod};
    use sampling_population::{Population, Row};

    #[test]
    fn summary_survives_lock_with_lock_time() {
        let population: Population = (0..200).map(|i| Row::new().with("id", i)).collect();
        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        manager
            .compute_plan(slot, &population, SamplingConfig::new().with_sample_size(20))
            .unwrap();
        let run = manager.run_sampling(slot, &population, Provenance::now()).unwrap();
        let receipt = manager.lock(slot).unwrap();

        let summary = manager.summary(slot).unwrap();
        assert_eq!(summary.locked_at, Some(receipt.locked_at));
        assert_eq!(summary.fingerprint, run.summary.fingerprint);
    }

    #[test]
    fn free_sampler_matches_manager() {
        let population: Population = (0..500).map(|i| Row::new().with("id", i)).collect();
        let config = SamplingConfig::new()
            .with_method(SamplingMethod::Systematic)
            .with_sample_size(40)
            .with_seed(3);

        let plan = compute_plan(&population, &config).unwrap();
        let direct = sample_data(&population, &config, &plan, Provenance::now()).unwrap();

        let manager = LifecycleManager::new();
        let slot = manager.open_slot().unwrap();
        manager.compute_plan(slot, &population, config).unwrap();
        let managed = manager.run_sampling(slot, &population, Provenance::now()).unwrap();

        assert_eq!(direct.sample.indices(), managed.sample.indices());
    }
}
