//! Exclusion filters
//!
//! A row is excluded from the eligible set when ANY filter matches it.

use crate::population::Row;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Comparison applied by an [`ExclusionFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Canonical text equal (case-sensitive)
    Equals,
    /// Canonical text differs (case-sensitive)
    NotEquals,
    /// Canonical text contains the filter text (case-sensitive)
    Contains,
    /// Both sides numeric and cell > filter value
    GreaterThan,
    /// Both sides numeric and cell < filter value
    LessThan,
}

impl FilterOperator {
    /// Wire name of the operator
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Contains => "contains",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
        }
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equals" => Ok(Self::Equals),
            "not_equals" => Ok(Self::NotEquals),
            "contains" => Ok(Self::Contains),
            "greater_than" => Ok(Self::GreaterThan),
            "less_than" => Ok(Self::LessThan),
            other => Err(format!("unknown filter operator: '{other}'")),
        }
    }
}

/// Rule removing rows from the eligible set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExclusionFilter {
    /// Column the rule reads
    pub column: String,
    /// Comparison
    pub operator: FilterOperator,
    /// Right-hand side
    pub value: Value,
}

impl ExclusionFilter {
    /// Create new filter
    #[inline]
    #[must_use]
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Check whether this filter excludes the row
    ///
    /// Numeric operators never match when either side fails to parse as a
    /// number.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.value(&self.column);
        match self.operator {
            FilterOperator::Equals => cell.to_text() == self.value.to_text(),
            FilterOperator::NotEquals => cell.to_text() != self.value.to_text(),
            FilterOperator::Contains => cell.to_text().contains(self.value.to_text().as_ref()),
            FilterOperator::GreaterThan => numeric_pair(cell, &self.value).is_some_and(|(a, b)| a > b),
            FilterOperator::LessThan => numeric_pair(cell, &self.value).is_some_and(|(a, b)| a < b),
        }
    }
}

fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    Some((left.as_number()?, right.as_number()?))
}

/// Check whether any filter excludes the row
#[inline]
#[must_use]
pub fn is_excluded(row: &Row, filters: &[ExclusionFilter]) -> bool {
    filters.iter().any(|f| f.matches(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new()
            .with("country", "US")
            .with("amount", 250.0)
            .with("note", "Closed account")
            .with("balance", "1200")
    }

    #[test]
    fn equals_is_case_sensitive() {
        assert!(ExclusionFilter::new("country", FilterOperator::Equals, "US").matches(&row()));
        assert!(!ExclusionFilter::new("country", FilterOperator::Equals, "us").matches(&row()));
    }

    #[test]
    fn equals_compares_canonical_text_of_numbers() {
        assert!(ExclusionFilter::new("amount", FilterOperator::Equals, "250").matches(&row()));
    }

    #[test]
    fn not_equals_matches_missing_cells() {
        let filter = ExclusionFilter::new("region", FilterOperator::NotEquals, "EU");
        assert!(filter.matches(&row()));
    }

    #[test]
    fn contains_is_substring() {
        assert!(ExclusionFilter::new("note", FilterOperator::Contains, "Closed").matches(&row()));
        assert!(!ExclusionFilter::new("note", FilterOperator::Contains, "closed").matches(&row()));
    }

    #[test]
    fn numeric_comparisons_parse_text() {
        assert!(ExclusionFilter::new("balance", FilterOperator::GreaterThan, 1000).matches(&row()));
        assert!(ExclusionFilter::new("amount", FilterOperator::LessThan, "300").matches(&row()));
        assert!(!ExclusionFilter::new("amount", FilterOperator::GreaterThan, 250).matches(&row()));
    }

    #[test]
    fn numeric_comparisons_skip_non_numbers() {
        assert!(!ExclusionFilter::new("country", FilterOperator::GreaterThan, 0).matches(&row()));
        assert!(!ExclusionFilter::new("amount", FilterOperator::LessThan, "abc").matches(&row()));
    }

    #[test]
    fn any_filter_excludes() {
        let filters = vec![
            ExclusionFilter::new("country", FilterOperator::Equals, "UK"),
            ExclusionFilter::new("amount", FilterOperator::GreaterThan, 100),
        ];
        assert!(is_excluded(&row(), &filters));
        assert!(!is_excluded(&row(), &filters[..1]));
        assert!(!is_excluded(&row(), &[]));
    }

    #[test]
    fn operator_round_trips_through_str() {
        for op in [
            FilterOperator::Equals,
            FilterOperator::NotEquals,
            FilterOperator::Contains,
            FilterOperator::GreaterThan,
            FilterOperator::LessThan,
        ] {
            assert_eq!(op.as_str().parse::<FilterOperator>().unwrap(), op);
        }
        assert!("between".parse::<FilterOperator>().is_err());
    }
}
