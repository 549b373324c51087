//! Error types for the sampling engine
//!
//! Every failure crossing the engine boundary is a [`SamplingError`] value:
//! - Configuration and input problems surfaced from planning
//! - Operations attempted out of lifecycle order
//! - Mutations of a locked slot (expected, user-facing)

use crate::store::SlotId;
use sampling_plan::PlanError;
use sampling_population::PopulationError;
use serde::{Deserialize, Serialize};

/// Main engine error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplingError {
    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Population has no rows
    #[error("population is empty")]
    EmptyPopulation,

    /// Exclusion filters removed every row
    #[error("no eligible rows remain after excluding {excluded} of them")]
    EmptyEligibleSet {
        /// Rows removed by the filters
        excluded: usize,
    },

    /// Operation attempted out of lifecycle order
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Slot holds a locked sample
    #[error("slot {slot} is locked")]
    AlreadyLocked {
        /// Locked slot
        slot: SlotId,
    },

    /// Population could not be read
    #[error("population error: {0}")]
    Population(String),
}

/// Error category, for callers that branch on the kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`SamplingError::InvalidConfiguration`]
    InvalidConfiguration,
    /// See [`SamplingError::EmptyPopulation`]
    EmptyPopulation,
    /// See [`SamplingError::EmptyEligibleSet`]
    EmptyEligibleSet,
    /// See [`SamplingError::InvalidState`]
    InvalidState,
    /// See [`SamplingError::AlreadyLocked`]
    AlreadyLocked,
    /// See [`SamplingError::Population`]
    Population,
}

impl SamplingError {
    /// Create invalid-state error
    #[inline]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Error category
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::EmptyPopulation => ErrorKind::EmptyPopulation,
            Self::EmptyEligibleSet { .. } => ErrorKind::EmptyEligibleSet,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::AlreadyLocked { .. } => ErrorKind::AlreadyLocked,
            Self::Population(_) => ErrorKind::Population,
        }
    }

    /// Check if the slot was locked
    #[inline]
    #[must_use]
    pub fn is_already_locked(&self) -> bool {
        matches!(self, Self::AlreadyLocked { .. })
    }

    /// Check if error is retryable
    ///
    /// Engine operations are deterministic, so retrying unchanged input
    /// reproduces the same error.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

impl From<PlanError> for SamplingError {
    fn from(value: PlanError) -> Self {
        match value {
            PlanError::InvalidConfiguration(message) => Self::InvalidConfiguration(message),
            PlanError::EmptyPopulation => Self::EmptyPopulation,
            PlanError::EmptyEligibleSet { excluded } => Self::EmptyEligibleSet { excluded },
        }
    }
}

impl From<PopulationError> for SamplingError {
    fn from(value: PopulationError) -> Self {
        Self::Population(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_errors_keep_their_kind() {
        assert_eq!(
            SamplingError::from(PlanError::invalid("bad")).kind(),
            ErrorKind::InvalidConfiguration
        );
        assert_eq!(
            SamplingError::from(PlanError::EmptyEligibleSet { excluded: 3 }),
            SamplingError::EmptyEligibleSet { excluded: 3 }
        );
    }

    #[test]
    fn locked_is_distinct_from_invalid_state() {
        let locked = SamplingError::AlreadyLocked { slot: SlotId::new() };
        assert!(locked.is_already_locked());
        assert!(!SamplingError::invalid_state("no sample").is_already_locked());
        assert!(!locked.is_retryable());
    }
}
