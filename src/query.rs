//! Query building: fingerprint one spectrum and search the index with it.

use log::debug;

use crate::config::{ConfigError, PipelineConfig};
use crate::fingerprint::{transform, BinWidth, SparseVector};
use crate::index::{GatewayError, Hit, IndexGateway, SearchRequest};
use crate::spectrum::Peak;

/// Errors from a search
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Every peak was filtered out; the index was not contacted
    #[error("empty spectrum after binning; nothing to search")]
    EmptyFingerprint,

    /// The index rejected the search
    #[error("search failed: {0}")]
    Gateway(#[from] GatewayError),
}

/// Ranked hits together with the query fingerprint that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Fingerprint sent to the index
    pub query: SparseVector,
    /// Hits in index order (descending score)
    pub hits: Vec<Hit>,
}

/// Builds and submits fingerprint searches.
///
/// Uses the same transform as ingestion; the bin width must match the one the
/// index was built with.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    bin_width: BinWidth,
    limit: usize,
    with_payload: bool,
}

impl QueryBuilder {
    /// Create a builder from a validated configuration
    pub fn new(config: &PipelineConfig) -> Result<Self, QueryError> {
        let bin_width = config.validate()?;
        Ok(Self {
            bin_width,
            limit: config.limit,
            with_payload: true,
        })
    }

    /// Request hits without payloads
    pub fn without_payload(mut self) -> Self {
        self.with_payload = false;
        self
    }

    /// Build the search request for a spectrum.
    pub fn build(&self, peaks: &[Peak]) -> Result<SearchRequest, QueryError> {
        let vector = transform(peaks, self.bin_width);
        if vector.is_empty() {
            return Err(QueryError::EmptyFingerprint);
        }

        Ok(SearchRequest {
            vector,
            limit: self.limit,
            with_payload: self.with_payload,
        })
    }

    /// Fingerprint `peaks` and search the index.
    ///
    /// Hits are returned in the gateway's order without re-sorting.
    pub fn search<G: IndexGateway + ?Sized>(
        &self,
        gateway: &G,
        peaks: &[Peak],
    ) -> Result<SearchOutcome, QueryError> {
        let request = self.build(peaks)?;
        debug!(
            "Searching with {} bins, limit {}",
            request.vector.len(),
            request.limit
        );

        let hits = gateway.search(&request)?;
        Ok(SearchOutcome {
            query: request.vector,
            hits,
        })
    }
}
