//! Error types for planning
//!
//! Covers the failures a plan can hit before any row is selected:
//! - Malformed statistical parameters or unknown columns
//! - Empty input population
//! - Filters that leave nothing eligible

/// Planning errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Configuration rejected before planning
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
}

impl PlanError {
    /// Create configuration error
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
