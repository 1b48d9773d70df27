//! Samples - raw input and validated feature sets
//!
//! A raw sample is whatever the poller or an operator handed us. It only
//! becomes a `FeatureSet` once every feature the inference endpoint needs is
//! present and numeric. Missing values are rejected, never defaulted to zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// RAW INPUT
// ============================================================================

/// Where a sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleOrigin {
    /// Polled from the time-series store
    Live,
    /// Submitted by an operator
    Manual,
}

/// Network endpoints a live sample was captured between
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl Provenance {
    pub fn is_empty(&self) -> bool {
        self.source_ip.is_none() && self.dest_ip.is_none() && self.protocol.is_none()
    }
}

/// Unvalidated sample
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub fields: Map<String, Value>,
    pub observed_at: Option<DateTime<Utc>>,
    pub provenance: Option<Provenance>,
    pub origin: SampleOrigin,
}

impl RawSample {
    /// Operator-entered sample (no provenance, no source time)
    pub fn manual(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            observed_at: None,
            provenance: None,
            origin: SampleOrigin::Manual,
        }
    }

    /// Sample polled from the live source
    pub fn live(
        fields: Map<String, Value>,
        observed_at: Option<DateTime<Utc>>,
        provenance: Option<Provenance>,
    ) -> Self {
        Self {
            fields,
            observed_at,
            provenance: provenance.filter(|p| !p.is_empty()),
            origin: SampleOrigin::Live,
        }
    }
}

// ============================================================================
// VALIDATED FEATURES
// ============================================================================

/// Flat numeric record in the shape the inference endpoint expects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeMap<String, f64>);

impl FeatureSet {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("required feature '{0}' is missing")]
    Missing(String),
    #[error("required feature '{0}' is null")]
    Null(String),
    #[error("feature '{0}' is not a number")]
    NotNumeric(String),
    #[error("feature '{0}' is not a finite number")]
    NotFinite(String),
}

impl SampleError {
    pub fn field(&self) -> &str {
        match self {
            SampleError::Missing(f)
            | SampleError::Null(f)
            | SampleError::NotNumeric(f)
            | SampleError::NotFinite(f) => f,
        }
    }
}

/// Extract the required features from a raw sample
///
/// Extra fields are ignored and not forwarded.
pub fn validate<S: AsRef<str>>(raw: &RawSample, required: &[S]) -> Result<FeatureSet, SampleError> {
    let mut features = BTreeMap::new();

    for name in required {
        let name = name.as_ref();
        let value = match raw.fields.get(name) {
            None => return Err(SampleError::Missing(name.to_string())),
            Some(Value::Null) => return Err(SampleError::Null(name.to_string())),
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| SampleError::NotNumeric(name.to_string()))?,
            Some(_) => return Err(SampleError::NotNumeric(name.to_string())),
        };

        if !value.is_finite() {
            return Err(SampleError::NotFinite(name.to_string()));
        }

        features.insert(name.to_string(), value);
    }

    Ok(FeatureSet(features))
}
