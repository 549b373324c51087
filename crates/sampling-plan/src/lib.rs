//! Sampling Plan
//!
//! Everything that happens before a single row is drawn.
//!
//! # Core Concepts
//!
//! - [`SamplingConfig`]: Per-attempt parameters (method, confidence, seed, strata)
//! - [`calculate_sample_size`]: Attribute sample size with finite-population correction
//! - [`StratumKey`]: Composite (field, value) key of one stratum
//! - [`compute_plan`]: Filter, stratify, allocate with the largest-remainder method
//! - [`add_coverage_overrides`]: Give every non-empty stratum at least one unit
//!
//! # Example
//!
//! ```rust
//! use sampling_plan::{add_coverage_overrides, compute_plan, SamplingConfig};
//! use sampling_population::{Population, Row};
//!
//! let population: Population = (0..1_000)
//!     .map(|i| Row::new().with("id", i).with("Country", if i < 900 { "US" } else { "UK" }))
//!     .collect();
//!
//! let config = SamplingConfig::new()
//!     .with_sample_size(100)
//!     .with_stratify_fields(["Country"]);
//!
//! let plan = compute_plan(&population, &config)?;
//! assert_eq!(plan.planned_size, 100);
//!
//! let plan = add_coverage_overrides(&plan);
//! assert!(plan.coverage_adjusted);
//! # Ok::<(), sampling_plan::PlanError>(())
//! ```

#![warn(unreachable_pub)]

mod calculator;
mod config;
mod coverage;
mod error;
mod plan;
mod planner;
mod stratum;

// Re-exports
pub use calculator::{
    calculate_sample_size, inverse_normal_cdf, z_score, SampleSizeRequest, DEFAULT_PROPORTION,
};
pub use config::{SamplingConfig, SamplingMethod, MAX_MARGIN_OF_ERROR};
pub use coverage::{add_coverage_overrides, starved_strata};
pub use error::PlanError;
pub use plan::{Allocation, PlanId, SamplingPlan};
pub use planner::{
    compute_plan, desired_size, largest_remainder, partition, plan_from_partition, Partition,
};
pub use stratum::StratumKey;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
