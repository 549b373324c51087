//! Sample value types

use chrono::{DateTime, Utc};
use sampling_plan::{PlanId, SamplingConfig, SamplingMethod, SamplingPlan, StratumKey};
use sampling_population::{Row, Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Who asked for a sample, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Requesting user or system, free form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
}

impl Provenance {
    /// Create provenance with an explicit timestamp
    #[inline]
    #[must_use]
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            requested_by: None,
            generated_at,
        }
    }

    /// Create provenance stamped now
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// With requester
    #[inline]
    #[must_use]
    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = Some(requested_by.into());
        self
    }
}

/// One selected row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampledRow {
    /// Position in the source population
    pub index: usize,
    /// Stratum the row was drawn from
    pub stratum: StratumKey,
    /// Copy of the source row
    pub row: Row,
}

/// Concrete rows drawn for one plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Plan the sample was drawn for
    pub plan_id: PlanId,
    /// Selection method
    pub method: SamplingMethod,
    /// Seed of the selection stream
    pub seed: u64,
    /// Selected rows, strata in plan order, population order within a stratum
    pub rows: Vec<SampledRow>,
    /// Configuration the sample is bound to
    pub config: SamplingConfig,
    /// Request metadata
    pub provenance: Provenance,
    /// Set once, by the lock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
}

impl Sample {
    /// Number of selected rows
    #[inline]
    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.rows.len()
    }

    /// Check if the sample has been locked
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked_at.is_some()
    }

    /// Selected population positions, in sample order
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.index).collect()
    }

    /// Row identifiers, in sample order
    ///
    /// Reads the configured id column; without one, the population position
    /// stands in as the identifier.
    #[must_use]
    pub fn identifiers(&self) -> Vec<Value> {
        match &self.config.id_column {
            Some(column) => self.rows.iter().map(|r| r.row.value(column).clone()).collect(),
            None => self.rows.iter().map(|r| Value::from(r.index)).collect(),
        }
    }

    /// Rows selected from one stratum
    #[must_use]
    pub fn count_in(&self, key: &StratumKey) -> usize {
        self.rows.iter().filter(|r| &r.stratum == key).count()
    }

    /// Check the sample was drawn for this plan
    #[inline]
    #[must_use]
    pub fn is_bound_to(&self, plan: &SamplingPlan) -> bool {
        self.plan_id == plan.id
    }

    /// SHA-256 over plan id, seed, method and every selected cell, hex encoded
    ///
    /// Independent of `locked_at` and provenance, so it is stable across
    /// the lock and identifies the evidence itself.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.plan_id.0.as_bytes());
        hasher.update(self.seed.to_le_bytes());
        update_str(&mut hasher, self.method.as_str());
        hasher.update((self.rows.len() as u64).to_le_bytes());

        for sampled in &self.rows {
            hasher.update((sampled.index as u64).to_le_bytes());
            hasher.update((sampled.row.len() as u64).to_le_bytes());
            for (column, value) in sampled.row.iter() {
                update_str(&mut hasher, column);
                update_value(&mut hasher, value);
            }
        }

        hex::encode(hasher.finalize())
    }
}

fn update_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => hasher.update([0u8]),
        Value::Bool(b) => hasher.update([1u8, u8::from(*b)]),
        Value::Number(n) => {
            hasher.update([2u8]);
            hasher.update(n.to_le_bytes());
        }
        Value::Text(s) => {
            hasher.update([3u8]);
            update_str(hasher, s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample {
            plan_id: PlanId::new(),
            method: SamplingMethod::Random,
            seed: 1,
            rows: vec![
                SampledRow {
                    index: 4,
                    stratum: StratumKey::all(),
                    row: Row::new().with("id", "C-4"),
                },
                SampledRow {
                    index: 9,
                    stratum: StratumKey::all(),
                    row: Row::new().with("id", "C-9"),
                },
            ],
            config: SamplingConfig::new().with_id_column("id"),
            provenance: Provenance::now(),
            locked_at: None,
        }
    }

    #[test]
    fn identifiers_use_id_column() {
        assert_eq!(sample().identifiers(), vec![Value::from("C-4"), Value::from("C-9")]);

        let mut unnamed = sample();
        unnamed.config.id_column = None;
        assert_eq!(unnamed.identifiers(), vec![Value::from(4usize), Value::from(9usize)]);
    }

    #[test]
    fn fingerprint_ignores_lock_and_provenance() {
        let s = sample();
        let mut locked = s.clone();
        locked.locked_at = Some(Utc::now());
        locked.provenance = Provenance::now().with_requested_by("auditor");
        assert_eq!(s.fingerprint(), locked.fingerprint());
        assert_eq!(s.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let s = sample();
        let mut changed = s.clone();
        changed.rows[1].row.insert("id", "C-10");
        assert_ne!(s.fingerprint(), changed.fingerprint());

        let mut reseeded = s.clone();
        reseeded.seed = 2;
        assert_ne!(s.fingerprint(), reseeded.fingerprint());
    }
}
