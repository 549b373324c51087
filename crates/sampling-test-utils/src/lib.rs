//! Testing utilities for the sampling workspace
//!
//! Shared population fixtures and configs.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use sampling_plan::SamplingConfig;
use sampling_population::{Population, Row, Value};

pub const ID_COLUMN: &str = "id";

pub fn control_id(index: usize) -> String {
    format!("C-{index:05}")
}

/// `n` rows with a unique `id` column
pub fn numbered_population(n: usize) -> Population {
    (0..n).map(|i| Row::new().with(ID_COLUMN, control_id(i))).collect()
}

/// Rows grouped by `field`, strata laid out in the given order
pub fn stratified_population(strata: &[(&str, usize)], field: &str) -> Population {
    let mut rows = Vec::new();
    for (value, count) in strata {
        for _ in 0..*count {
            let index = rows.len();
            rows.push(Row::new().with(ID_COLUMN, control_id(index)).with(field, *value));
        }
    }
    Population::new(rows)
}

/// Stratified population with an `Amount` column counting up from 1
pub fn ledger_population(strata: &[(&str, usize)], field: &str) -> Population {
    let rows: Vec<Row> = stratified_population(strata, field)
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| row.clone().with("Amount", Value::from(i + 1)))
        .collect();
    Population::new(rows)
}

pub fn default_config() -> SamplingConfig {
    SamplingConfig::new().with_id_column(ID_COLUMN)
}

pub fn stratified_config(size: usize, field: &str) -> SamplingConfig {
    default_config()
        .with_sample_size(size)
        .with_stratify_fields([field])
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
        .single()
        .unwrap_or_default()
}

pub fn assert_strictly_increasing(indices: &[usize]) {
    assert!(
        indices.windows(2).all(|w| w[0] < w[1]),
        "indices not strictly increasing: {indices:?}"
    );
}
