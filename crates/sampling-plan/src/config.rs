//! Sampling configuration
//!
//! [`SamplingConfig`] is the immutable value a caller supplies per planning
//! attempt. It is serde camelCase so request layers and TOML files can carry
//! it as-is.

use crate::error::PlanError;
use sampling_population::ExclusionFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// How rows are chosen and how the desired size is derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMethod {
    /// Calculated size, uniform random selection
    #[default]
    Statistical,
    /// Uniform random selection
    Random,
    /// Random start, fixed interval
    Systematic,
    /// Fixed share of the eligible rows, uniform random selection
    Percentage,
}

impl SamplingMethod {
    /// Wire name of the method
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statistical => "statistical",
            Self::Random => "random",
            Self::Systematic => "systematic",
            Self::Percentage => "percentage",
        }
    }

    /// Check if rows are picked at a fixed interval
    #[inline]
    #[must_use]
    pub fn is_systematic(self) -> bool {
        matches!(self, Self::Systematic)
    }
}

impl Display for SamplingMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sampling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplingConfig {
    /// Selection method
    #[serde(default)]
    pub method: SamplingMethod,
    /// Confidence level in (0, 1)
    pub confidence_level: f64,
    /// Tolerable error (margin) in (0, 0.99]
    pub margin_of_error: f64,
    /// Expected error rate in [0, 1)
    #[serde(default)]
    pub expected_error_rate: f64,
    /// Use the maximum-variance proportion when sizing
    #[serde(default)]
    pub conservative: bool,
    /// Fixed sample size, takes precedence over any calculation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size_override: Option<usize>,
    /// Share of eligible rows in (0, 100], required for the percentage method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_percentage: Option<f64>,
    /// Seed for the selection stream
    pub seed: u64,
    /// Grouping fields, in order
    #[serde(default)]
    pub stratify_fields: Vec<String>,
    /// Column identifying a row in reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_column: Option<String>,
    /// Exclusion rules, in order
    #[serde(default)]
    pub exclusions: Vec<ExclusionFilter>,
}

impl SamplingConfig {
    /// Create default configuration (statistical, 95% / 5%)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With selection method
    #[inline]
    #[must_use]
    pub fn with_method(mut self, method: SamplingMethod) -> Self {
        self.method = method;
        self
    }

    /// With confidence level
    #[inline]
    #[must_use]
    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// With margin of error
    #[inline]
    #[must_use]
    pub fn with_margin_of_error(mut self, margin_of_error: f64) -> Self {
        self.margin_of_error = margin_of_error;
        self
    }

    /// With expected error rate
    #[inline]
    #[must_use]
    pub fn with_expected_error_rate(mut self, rate: f64) -> Self {
        self.expected_error_rate = rate;
        self
    }

    /// Size with the maximum-variance proportion
    #[inline]
    #[must_use]
    pub fn conservative(mut self) -> Self {
        self.conservative = true;
        self
    }

    /// With fixed sample size
    #[inline]
    #[must_use]
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size_override = Some(size);
        self
    }

    /// With sample percentage (also switches to the percentage method)
    #[inline]
    #[must_use]
    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.method = SamplingMethod::Percentage;
        self.sample_percentage = Some(percentage);
        self
    }

    /// With seed
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// With grouping fields
    #[must_use]
    pub fn with_stratify_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stratify_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// With id column
    #[inline]
    #[must_use]
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = Some(column.into());
        self
    }

    /// Add an exclusion rule
    #[inline]
    #[must_use]
    pub fn with_exclusion(mut self, filter: ExclusionFilter) -> Self {
        self.exclusions.push(filter);
        self
    }

    /// Validate statistical parameters only
    ///
    /// # Errors
    /// [`PlanError::InvalidConfiguration`] naming the first bad parameter
    pub fn validate_parameters(&self) -> Result<(), PlanError> {
        validate_statistics(
            self.confidence_level,
            self.margin_of_error,
            self.expected_error_rate,
        )?;

        if self.sample_size_override == Some(0) {
            return Err(PlanError::invalid("sample size override must be positive"));
        }

        match self.sample_percentage {
            Some(p) if !(p > 0.0 && p <= 100.0) => {
                return Err(PlanError::invalid(format!(
                    "sample percentage must be in (0, 100], got {p}"
                )));
            }
            None if self.method == SamplingMethod::Percentage => {
                return Err(PlanError::invalid(
                    "percentage method requires a sample percentage",
                ));
            }
            _ => {}
        }

        Ok(())
    }

    /// Validate the whole configuration against a population's columns
    ///
    /// # Errors
    /// [`PlanError::InvalidConfiguration`] for bad parameters, duplicate or
    /// unknown stratify fields, or an unknown id column
    pub fn validate(&self, columns: &[String]) -> Result<(), PlanError> {
        self.validate_parameters()?;

        let known = |field: &str| columns.iter().any(|c| c == field);
        let mut seen = HashSet::new();
        for field in &self.stratify_fields {
            if !seen.insert(field.as_str()) {
                return Err(PlanError::invalid(format!(
                    "stratify field listed twice: '{field}'"
                )));
            }
            if !known(field) {
                return Err(PlanError::invalid(format!(
                    "unknown stratify field: '{field}'"
                )));
            }
        }

        if let Some(id) = &self.id_column {
            if !known(id) {
                return Err(PlanError::invalid(format!("unknown id column: '{id}'")));
            }
        }

        Ok(())
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            method: SamplingMethod::Statistical,
            confidence_level: 0.95,
            margin_of_error: 0.05,
            expected_error_rate: 0.0,
            conservative: false,
            sample_size_override: None,
            sample_percentage: None,
            seed: 42,
            stratify_fields: Vec::new(),
            id_column: None,
            exclusions: Vec::new(),
        }
    }
}

/// Upper bound of the tolerable error
pub const MAX_MARGIN_OF_ERROR: f64 = 0.99;

/// Check confidence, margin and expected error rate ranges
///
/// Confidence in (0, 1), margin in (0, 0.99], expected rate in [0, 1).
pub(crate) fn validate_statistics(
    confidence_level: f64,
    margin_of_error: f64,
    expected_error_rate: f64,
) -> Result<(), PlanError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(PlanError::invalid(format!(
            "confidence level must be in (0, 1), got {confidence_level}"
        )));
    }
    if !(margin_of_error > 0.0 && margin_of_error <= MAX_MARGIN_OF_ERROR) {
        return Err(PlanError::invalid(format!(
            "margin of error must be in (0, {MAX_MARGIN_OF_ERROR}], got {margin_of_error}"
        )));
    }
    if !(0.0..1.0).contains(&expected_error_rate) {
        return Err(PlanError::invalid(format!(
            "expected error rate must be in [0, 1), got {expected_error_rate}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["id".into(), "Country".into(), "Region".into()]
    }

    #[test]
    fn default_is_valid() {
        assert!(SamplingConfig::new().validate(&columns()).is_ok());
    }

    #[test]
    fn rejects_out_of_range_statistics() {
        for config in [
            SamplingConfig::new().with_confidence_level(1.0),
            SamplingConfig::new().with_confidence_level(0.0),
            SamplingConfig::new().with_confidence_level(f64::NAN),
            SamplingConfig::new().with_margin_of_error(0.0),
            SamplingConfig::new().with_margin_of_error(-0.1),
            SamplingConfig::new().with_margin_of_error(0.995),
            SamplingConfig::new().with_expected_error_rate(1.0),
        ] {
            assert!(matches!(
                config.validate_parameters(),
                Err(PlanError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn margin_upper_bound_is_inclusive() {
        assert!(SamplingConfig::new()
            .with_margin_of_error(MAX_MARGIN_OF_ERROR)
            .validate_parameters()
            .is_ok());
        assert!(SamplingConfig::new()
            .with_margin_of_error(1.0)
            .validate_parameters()
            .is_err());
    }

    #[test]
    fn percentage_method_requires_percentage() {
        let config = SamplingConfig::new().with_method(SamplingMethod::Percentage);
        assert!(config.validate_parameters().is_err());

        assert!(SamplingConfig::new().with_percentage(10.0).validate_parameters().is_ok());
        assert!(SamplingConfig::new().with_percentage(0.0).validate_parameters().is_err());
        assert!(SamplingConfig::new().with_percentage(100.5).validate_parameters().is_err());
    }

    #[test]
    fn zero_override_is_rejected() {
        assert!(SamplingConfig::new().with_sample_size(0).validate_parameters().is_err());
    }

    #[test]
    fn stratify_fields_must_be_known_and_unique() {
        let unknown = SamplingConfig::new().with_stratify_fields(["Segment"]);
        assert!(unknown.validate(&columns()).is_err());

        let dup = SamplingConfig::new().with_stratify_fields(["Country", "Country"]);
        assert!(dup.validate(&columns()).is_err());

        let ok = SamplingConfig::new().with_stratify_fields(["Country", "Region"]);
        assert!(ok.validate(&columns()).is_ok());
    }

    #[test]
    fn id_column_must_be_known() {
        let config = SamplingConfig::new().with_id_column("customer_id");
        assert!(config.validate(&columns()).is_err());
    }

    #[test]
    fn loads_from_toml() {
        let config: SamplingConfig = toml::from_str(
            r#"
            method = "systematic"
            confidenceLevel = 0.9
            marginOfError = 0.05
            expectedErrorRate = 0.02
            seed = 7
            stratifyFields = ["Country"]
            idColumn = "id"

            [[exclusions]]
            column = "Region"
            operator = "equals"
            value = "EU"
            "#,
        )
        .unwrap();

        assert_eq!(config.method, SamplingMethod::Systematic);
        assert_eq!(config.seed, 7);
        assert_eq!(config.stratify_fields, ["Country"]);
        assert_eq!(config.exclusions.len(), 1);
        assert!(config.validate(&columns()).is_ok());
    }

    #[test]
    fn missing_toml_fields_take_defaults() {
        let config: SamplingConfig = toml::from_str("sampleSizeOverride = 25").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.method, SamplingMethod::Statistical);
        assert_eq!(config.sample_size_override, Some(25));
        assert!((config.confidence_level - 0.95).abs() < f64::EPSILON);
    }
}
