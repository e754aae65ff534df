//! Canonical spectrum records shared by the extractors, the fingerprint
//! transform and the index gateways.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Free-form spectrum annotations (e.g. `NAME`, `PRECURSORMZ`), keyed by the
/// header name exactly as it appeared in the source.
pub type Metadata = HashMap<String, String>;

/// A single raw centroid peak.
///
/// Values are kept as read; noise (zero or negative intensity, negative m/z)
/// is filtered later by the fingerprint transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Mass-to-charge ratio
    pub mz: f64,
    /// Peak intensity
    pub intensity: f64,
}

impl Peak {
    /// Create a new peak
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

impl From<(f64, f64)> for Peak {
    fn from((mz, intensity): (f64, f64)) -> Self {
        Self { mz, intensity }
    }
}

/// Identifier of a point in the similarity index.
///
/// Serialized untagged, so `42` and `"NIST-0001"` are both valid on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    /// Unsigned integer identifier
    Num(u64),
    /// String identifier (UUIDs, library accessions)
    Str(String),
}

impl PointId {
    /// Generate a fresh random UUID v4 identifier.
    pub fn random() -> Self {
        PointId::Str(uuid::Uuid::new_v4().to_string())
    }

    /// Interpret a JSON value taken from an identifier column.
    ///
    /// Non-negative integers become numeric ids, strings are kept verbatim and
    /// anything else is rendered to its JSON text. Returns `None` for null.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(id) => Some(PointId::Num(id)),
                None => Some(PointId::Str(n.to_string())),
            },
            serde_json::Value::String(s) => Some(PointId::Str(s.clone())),
            other => Some(PointId::Str(other.to_string())),
        }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(id) => write!(f, "{}", id),
            PointId::Str(id) => f.write_str(id),
        }
    }
}

impl From<u64> for PointId {
    fn from(id: u64) -> Self {
        PointId::Num(id)
    }
}

impl From<&str> for PointId {
    fn from(id: &str) -> Self {
        PointId::Str(id.to_string())
    }
}

impl From<String> for PointId {
    fn from(id: String) -> Self {
        PointId::Str(id)
    }
}

/// One spectrum as produced by an extractor: a peak list, its metadata and,
/// when the source carries one, an identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumRecord {
    /// Identifier taken from the source, if any
    pub id: Option<PointId>,
    /// Raw peaks in source order
    pub peaks: Vec<Peak>,
    /// Header annotations
    pub metadata: Metadata,
}

impl SpectrumRecord {
    /// Create a record from peaks alone.
    pub fn from_peaks(peaks: Vec<Peak>) -> Self {
        Self {
            peaks,
            ..Default::default()
        }
    }

    /// Returns true if the record holds neither peaks nor metadata.
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty() && self.metadata.is_empty()
    }

    /// Number of peaks in the record
    pub fn peak_count(&self) -> usize {
        self.peaks.len()
    }
}
