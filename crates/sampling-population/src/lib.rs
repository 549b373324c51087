//! Sampling Population Model
//!
//! Read-only tabular input for the sampling engine.
//!
//! # Core Concepts
//!
//! - [`Value`]: Scalar cell (null, bool, number, text) with key-safe equality
//! - [`Row`]: Ordered column → value mapping
//! - [`Population`]: Ordered rows plus materialized column list
//! - [`ExclusionFilter`]: Rule removing rows from the eligible set
//!
//! # Example
//!
//! ```rust
//! use sampling_population::{ExclusionFilter, FilterOperator, Population, Row};
//!
//! let population = Population::new(vec![
//!     Row::new().with("id", 1).with("country", "US"),
//!     Row::new().with("id", 2).with("country", "UK"),
//! ]);
//! assert_eq!(population.columns(), ["id", "country"]);
//!
//! let filter = ExclusionFilter::new("country", FilterOperator::Equals, "UK");
//! assert!(filter.matches(&population.rows()[1]));
//! ```

#![warn(unreachable_pub)]

mod error;
mod filter;
mod population;
mod value;

// Re-exports
pub use error::PopulationError;
pub use filter::{is_excluded, ExclusionFilter, FilterOperator};
pub use population::{Population, Row};
pub use value::Value;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn filters_apply_to_parsed_population() {
        let population = Population::from_json_str(
            r#"[
                {"id": "C-1", "status": "active", "balance": 10},
                {"id": "C-2", "status": "closed", "balance": 500},
                {"id": "C-3", "balance": 20}
            ]"#,
        )
        .unwrap();

        let filters = vec![
            ExclusionFilter::new("status", FilterOperator::Equals, "closed"),
            ExclusionFilter::new("balance", FilterOperator::LessThan, 15),
        ];

        let eligible: Vec<&str> = population
            .rows()
            .iter()
            .filter(|row| !is_excluded(row, &filters))
            .filter_map(|row| match row.value("id") {
                Value::Text(id) => Some(id.as_str()),
                _ => None,
            })
            .collect();

        assert_eq!(eligible, ["C-3"]);
    }
}
