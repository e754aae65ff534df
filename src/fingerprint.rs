//! Spectral fingerprint transform.
//!
//! A fingerprint is the sparse, L2-normalized vector obtained by quantizing
//! each peak's m/z into a fixed-width bin and summing the intensities that
//! land in the same bin:
//!
//! ```text
//! bin(p)   = floor(p.mz / bin_width)
//! raw[b]   = sum of p.intensity over surviving peaks with bin(p) = b
//! value[b] = raw[b] / sqrt(sum of raw[k]^2)
//! ```
//!
//! Peaks with `intensity <= 0`, `mz < 0`, or non-finite values are dropped
//! before binning. The same transform (with the same bin width) must be used
//! for ingestion and for queries, otherwise dot-product scores between the two
//! are meaningless.
//!
//! ```rust
//! use mzvec::fingerprint::{transform, BinWidth};
//! use mzvec::spectrum::Peak;
//!
//! let peaks = [Peak::new(0.05, 1.0), Peak::new(0.09, 2.0), Peak::new(1.23, 4.0)];
//! let fp = transform(&peaks, BinWidth::new(0.1)?);
//!
//! assert_eq!(fp.indices, vec![0, 12]);
//! assert!((fp.norm() - 1.0).abs() < 1e-9);
//! # Ok::<(), mzvec::fingerprint::FingerprintError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::spectrum::Peak;

/// Default m/z bin width in Th
pub const DEFAULT_BIN_WIDTH: f64 = 0.1;

/// Errors raised for invalid transform input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FingerprintError {
    /// Bin width is zero, negative or not finite
    #[error("bin width must be a positive finite number, got {0}")]
    InvalidBinWidth(f64),

    /// Parallel m/z and intensity arrays differ in length
    #[error("m/z and intensity lengths differ ({mz} vs {intensity})")]
    LengthMismatch {
        /// Length of the m/z array
        mz: usize,
        /// Length of the intensity array
        intensity: usize,
    },

    /// Externally supplied vector violates the sparse vector invariants
    #[error("invalid sparse vector: {0}")]
    InvalidVector(String),
}

/// Validated m/z bin width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BinWidth(f64);

impl BinWidth {
    /// Create a bin width, rejecting zero, negative and non-finite values.
    pub fn new(width: f64) -> Result<Self, FingerprintError> {
        if width.is_finite() && width > 0.0 {
            Ok(Self(width))
        } else {
            Err(FingerprintError::InvalidBinWidth(width))
        }
    }

    /// The width in Th
    pub fn get(self) -> f64 {
        self.0
    }

    /// Bin index for an m/z value, or `None` if it falls outside `u32`.
    pub fn bin_of(self, mz: f64) -> Option<u32> {
        let bin = (mz / self.0).floor();
        if bin.is_finite() && bin >= 0.0 && bin <= u32::MAX as f64 {
            Some(bin as u32)
        } else {
            None
        }
    }
}

impl Default for BinWidth {
    fn default() -> Self {
        Self(DEFAULT_BIN_WIDTH)
    }
}

impl TryFrom<f64> for BinWidth {
    type Error = FingerprintError;

    fn try_from(width: f64) -> Result<Self, Self::Error> {
        Self::new(width)
    }
}

impl From<BinWidth> for f64 {
    fn from(width: BinWidth) -> Self {
        width.0
    }
}

/// Sparse vector of bin indices and values.
///
/// Invariants: `indices.len() == values.len()`, indices strictly increasing.
/// Fingerprints produced by [`transform`] are additionally unit length. The
/// empty vector means "nothing to index".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Bin indices, strictly increasing
    pub indices: Vec<u32>,
    /// Bin values, parallel to `indices`
    pub values: Vec<f64>,
}

impl SparseVector {
    /// Create an empty vector.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a vector from externally supplied parts, checking the invariants.
    pub fn try_new(indices: Vec<u32>, values: Vec<f64>) -> Result<Self, FingerprintError> {
        if indices.len() != values.len() {
            return Err(FingerprintError::InvalidVector(format!(
                "{} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if let Some(pos) = indices.windows(2).position(|w| w[0] >= w[1]) {
            return Err(FingerprintError::InvalidVector(format!(
                "indices not strictly increasing at position {}",
                pos + 1
            )));
        }
        Ok(Self { indices, values })
    }

    /// Number of non-zero entries
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns true for the empty fingerprint
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// L2 norm of the values
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Sparse dot product. For two fingerprints this is their cosine similarity.
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Iterate `(index, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

fn keep_peak(peak: &Peak) -> bool {
    peak.mz.is_finite() && peak.intensity.is_finite() && peak.mz >= 0.0 && peak.intensity > 0.0
}

/// Convert a peak list into its fingerprint.
///
/// Deterministic and independent of peak order: contributions to a bin are
/// summed in a canonical order so permuted inputs give bit-identical output.
///
/// Intensities are rescaled by the largest one before summing, so any finite
/// positive input normalizes to unit length. Bins whose rescaled value
/// underflows to zero are dropped.
pub fn transform(peaks: &[Peak], bin_width: BinWidth) -> SparseVector {
    let mut binned: Vec<(u32, f64)> = peaks
        .iter()
        .filter(|p| keep_peak(p))
        .filter_map(|p| bin_width.bin_of(p.mz).map(|bin| (bin, p.intensity)))
        .collect();

    if binned.is_empty() {
        return SparseVector::empty();
    }

    binned.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
    let scale = binned.iter().fold(0.0f64, |max, &(_, intensity)| max.max(intensity));

    let mut indices: Vec<u32> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for (bin, intensity) in binned {
        let scaled = intensity / scale;
        match indices.last() {
            Some(&last) if last == bin => {
                if let Some(value) = values.last_mut() {
                    *value += scaled;
                }
            }
            _ => {
                indices.push(bin);
                values.push(scaled);
            }
        }
    }

    // The largest peak contributes 1.0, so the norm is at least 1 and finite.
    let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
    let mut vector = SparseVector::empty();
    for (bin, value) in indices.into_iter().zip(values) {
        let value = value / norm;
        if value > 0.0 {
            vector.indices.push(bin);
            vector.values.push(value);
        }
    }

    vector
}

/// Convert parallel m/z and intensity arrays into a fingerprint.
///
/// Fails before any work if the arrays differ in length.
pub fn transform_arrays(
    mz: &[f64],
    intensity: &[f64],
    bin_width: BinWidth,
) -> Result<SparseVector, FingerprintError> {
    if mz.len() != intensity.len() {
        return Err(FingerprintError::LengthMismatch {
            mz: mz.len(),
            intensity: intensity.len(),
        });
    }

    let peaks: Vec<Peak> = mz
        .iter()
        .zip(intensity)
        .map(|(&mz, &intensity)| Peak::new(mz, intensity))
        .collect();

    Ok(transform(&peaks, bin_width))
}
