//! Minimum-coverage adjustment
//!
//! Proportional allocation can round a small stratum down to zero units.
//! The adjuster gives every non-empty stratum at least one.

use crate::plan::SamplingPlan;

/// Number of strata the adjuster would raise
#[must_use]
pub fn starved_strata(plan: &SamplingPlan) -> usize {
    plan.allocations.iter().filter(|a| a.is_starved()).count()
}

/// Raise every starved stratum to one unit
///
/// Returns a new plan with the same id; `planned_size` grows by exactly the
/// number of raised strata. Applying it to an adjusted plan is a no-op.
#[must_use]
pub fn add_coverage_overrides(plan: &SamplingPlan) -> SamplingPlan {
    let mut adjusted = plan.clone();
    let mut raised = 0;

    for allocation in adjusted.allocations.iter_mut().filter(|a| a.is_starved()) {
        allocation.sample_count = 1;
        allocation.coverage_override = true;
        raised += 1;
        tracing::debug!(stratum = %allocation.key, "coverage override applied");
    }

    adjusted.coverage_adjusted = true;
    adjusted.recompute_totals();

    if raised > 0 {
        tracing::info!(
            plan = %adjusted.id,
            raised,
            planned = adjusted.planned_size,
            "coverage overrides added"
        );
    }

    adjusted
}
