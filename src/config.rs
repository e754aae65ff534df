//! Pipeline configuration shared by ingestion and search.
//!
//! The bin width must be the same on both paths; it is passed explicitly
//! rather than stored with the index.

use serde::{Deserialize, Serialize};

use crate::fingerprint::{BinWidth, FingerprintError, DEFAULT_BIN_WIDTH};

/// Default number of points per upsert batch
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Default number of hits returned by a search
pub const DEFAULT_RESULT_LIMIT: usize = 10;

/// Default progress logging interval (points)
pub const DEFAULT_PROGRESS_INTERVAL: usize = 1000;

/// Payload key under which the `id_key` metadata value is copied
pub const ORIGINAL_ID_KEY: &str = "original_id";

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Bin width rejected
    #[error(transparent)]
    BinWidth(#[from] FingerprintError),

    /// Batch size of zero
    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    /// Result limit of zero
    #[error("result limit must be at least 1")]
    ZeroLimit,
}

/// Settings for the fingerprint, ingestion and query stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// m/z bin width in Th
    pub bin_width: f64,
    /// Points per upsert batch
    pub batch_size: usize,
    /// Hits per search
    pub limit: usize,
    /// Metadata key whose value is copied into the payload as `original_id`
    pub id_key: Option<String>,
    /// Log progress every N ingested points
    pub progress_interval: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bin_width: DEFAULT_BIN_WIDTH,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: DEFAULT_RESULT_LIMIT,
            id_key: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl PipelineConfig {
    /// Check every value, returning the validated bin width.
    pub fn validate(&self) -> Result<BinWidth, ConfigError> {
        let bin_width = BinWidth::new(self.bin_width)?;
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        Ok(bin_width)
    }

    /// Set the bin width
    pub fn with_bin_width(mut self, bin_width: f64) -> Self {
        self.bin_width = bin_width;
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the result limit
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the metadata key aliased as `original_id`
    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = Some(id_key.into());
        self
    }
}
