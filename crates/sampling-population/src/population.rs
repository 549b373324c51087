//! Population rows and column materialization

use crate::error::PopulationError;
use crate::value::Value;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

static NULL: Value = Value::Null;

/// One record of the population
///
/// Ordered mapping from column name to [`Value`]. A column the row does
/// not carry reads as [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, Value>);

impl Row {
    /// Create empty row
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell, returning the row (builder style)
    #[inline]
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Set a cell
    #[inline]
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Cell value, `Null` when the column is absent
    #[inline]
    #[must_use]
    pub fn value(&self, column: &str) -> &Value {
        self.0.get(column).unwrap_or(&NULL)
    }

    /// Cell value only if the column is present
    #[inline]
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Column names carried by this row, in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate cells in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of cells
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if row has no cells
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Finite, ordered, read-only set of candidate records
///
/// The column list is the union of all row keys in order of first
/// appearance. Nothing in the engine mutates a population once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Row>", into = "Vec<Row>")]
pub struct Population {
    rows: Vec<Row>,
    columns: Vec<String>,
}

impl Population {
    /// Build population from rows, materializing columns
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        let mut columns: IndexSet<String> = IndexSet::new();
        for row in &rows {
            for column in row.columns() {
                if !columns.contains(column) {
                    columns.insert(column.to_string());
                }
            }
        }

        Self {
            rows,
            columns: columns.into_iter().collect(),
        }
    }

    /// Parse a JSON array of records
    ///
    /// # Errors
    /// - [`PopulationError::Parse`] for malformed JSON
    /// - [`PopulationError::NotArray`] if the document is not an array
    /// - [`PopulationError::NotRecord`] for a non-object element
    pub fn from_json_str(input: &str) -> Result<Self, PopulationError> {
        let document: serde_json::Value = serde_json::from_str(input)?;
        let serde_json::Value::Array(elements) = document else {
            return Err(PopulationError::NotArray);
        };

        let rows = elements
            .iter()
            .enumerate()
            .map(|(index, element)| match element {
                serde_json::Value::Object(map) => Ok(map
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect::<Row>()),
                _ => Err(PopulationError::NotRecord { index }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(rows))
    }

    /// All rows in population order
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Row at position
    #[inline]
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Materialized column names
    #[inline]
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Check if any row carries the column
    #[inline]
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if population has no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Row>> for Population {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}

impl From<Population> for Vec<Row> {
    fn from(population: Population) -> Self {
        population.rows
    }
}

impl FromIterator<Row> for Population {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_follow_first_appearance() {
        let population = Population::new(vec![
            Row::new().with("id", 1).with("country", "US"),
            Row::new().with("region", "EU").with("id", 2),
            Row::new().with("country", "UK").with("amount", 10.5),
        ]);

        assert_eq!(population.columns(), ["id", "country", "region", "amount"]);
        assert!(population.has_column("region"));
        assert!(!population.has_column("missing"));
    }

    #[test]
    fn missing_cell_reads_as_null() {
        let row = Row::new().with("id", 1);
        assert!(row.value("country").is_null());
        assert!(row.get("country").is_none());
    }

    #[test]
    fn parses_json_records() {
        let population =
            Population::from_json_str(r#"[{"id": 1, "ok": true}, {"id": 2, "tag": null}]"#)
                .unwrap();

        assert_eq!(population.len(), 2);
        assert_eq!(population.columns(), ["id", "ok", "tag"]);
        assert_eq!(population.rows()[1].value("id"), &Value::Number(2.0));
    }

    #[test]
    fn json_keeps_document_key_order() {
        let population = Population::from_json_str(
            r#"[{"name": "a", "Country": "US", "id": 1}, {"zeta": 0, "alpha": 1}]"#,
        )
        .unwrap();

        assert_eq!(population.columns(), ["name", "Country", "id", "zeta", "alpha"]);
        let cells: Vec<&str> = population.rows()[0].columns().collect();
        assert_eq!(cells, ["name", "Country", "id"]);

        let built = Row::new().with("name", "a").with("Country", "US").with("id", 1);
        assert_eq!(population.rows()[0], built);
    }

    #[test]
    fn rejects_non_records() {
        assert!(matches!(
            Population::from_json_str(r#"[{"id": 1}, 7]"#),
            Err(PopulationError::NotRecord { index: 1 })
        ));
        assert!(matches!(
            Population::from_json_str(r#"{"id": 1}"#),
            Err(PopulationError::NotArray)
        ));
        assert!(matches!(
            Population::from_json_str("[{"),
            Err(PopulationError::Parse(_))
        ));
    }

    #[test]
    fn serde_keeps_columns_consistent() {
        let population = Population::new(vec![Row::new().with("a", 1), Row::new().with("b", 2)]);
        let json = serde_json::to_string(&population).unwrap();
        let back: Population = serde_json::from_str(&json).unwrap();
        assert_eq!(back.columns(), ["a", "b"]);
    }

    proptest::proptest! {
        #[test]
        fn prop_columns_are_first_appearance_union(
            rows in proptest::collection::vec(
                proptest::collection::vec(0usize..6, 0..5),
                0..8,
            )
        ) {
            let population: Population = rows
                .iter()
                .map(|keys| keys.iter().map(|k| (format!("c{k}"), Value::from(*k))).collect::<Row>())
                .collect();

            let mut expected: Vec<String> = Vec::new();
            for keys in &rows {
                for k in keys {
                    let column = format!("c{k}");
                    if !expected.contains(&column) {
                        expected.push(column);
                    }
                }
            }
            proptest::prop_assert_eq!(population.columns(), expected.as_slice());
        }
    }
}

