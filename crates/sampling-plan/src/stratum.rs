//! Composite stratum keys

use sampling_population::{Row, Value};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Identity of one stratum: ordered (field, value) pairs
///
/// Equality and hashing are structural over the pairs, so values containing
/// separator characters can never collide. The empty key is the single
/// stratum of an unstratified plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StratumKey(Vec<(String, Value)>);

impl StratumKey {
    /// Key of the whole population (no stratification)
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self(Vec::new())
    }

    /// Create key from explicit pairs
    #[must_use]
    pub fn new<I, K, V>(parts: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            parts
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Key a row falls into for the given fields
    ///
    /// Missing cells key as [`Value::Null`].
    #[must_use]
    pub fn from_row(row: &Row, fields: &[String]) -> Self {
        Self(
            fields
                .iter()
                .map(|field| (field.clone(), row.value(field).clone()))
                .collect(),
        )
    }

    /// Key pairs in field order
    #[inline]
    #[must_use]
    pub fn parts(&self) -> &[(String, Value)] {
        &self.0
    }

    /// Value of one field within the key
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.0.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    /// Check if this is the whole-population key
    #[inline]
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for StratumKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(all)");
        }
        for (i, (field, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}
