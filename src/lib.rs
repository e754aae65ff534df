//! # mzvec - Spectral Fingerprints for Similarity Search
//!
//! `mzvec` turns mass spectra into sparse, L2-normalized fingerprints and feeds
//! them to (or queries them against) a sparse-vector similarity index.
//!
//! ## Pipeline
//!
//! ```text
//! source file ─▶ extractor ─▶ SpectrumRecord ─▶ transform ─▶ Point ─▶ batch ─▶ upsert
//! query file  ─▶ extractor ─▶ peaks ─▶ transform ─▶ SearchRequest ─▶ search ─▶ hits
//! ```
//!
//! - [`extract`]: readers for MSP libraries, id + JSON-array tables, and
//!   two-column peak lists
//! - [`fingerprint`]: the binning and normalization transform
//! - [`ingest`]: batching orchestrator
//! - [`query`]: query construction and result handling
//! - [`index`]: the gateway trait and its HTTP and in-memory implementations
//!
//! ## Quick Start
//!
//! ```rust
//! use mzvec::config::PipelineConfig;
//! use mzvec::extract::{MspReader, SpectrumSource};
//! use mzvec::index::MemoryGateway;
//! use mzvec::ingest::Ingestor;
//! use mzvec::query::QueryBuilder;
//! use mzvec::spectrum::Peak;
//! use std::io::Cursor;
//!
//! let library = "NAME: Caffeine\nNum Peaks: 2\n138.06 100\n195.09 45\n";
//! let config = PipelineConfig::default();
//!
//! let mut ingestor = Ingestor::new(MemoryGateway::default(), &config)?;
//! let stats = ingestor.ingest_source(MspReader::new(Cursor::new(library)))?;
//! assert_eq!(stats.points_ingested, 1);
//!
//! let gateway = ingestor.into_inner();
//! let outcome = QueryBuilder::new(&config)?
//!     .search(&gateway, &[Peak::new(138.06, 90.0), Peak::new(195.09, 40.0)])?;
//! assert_eq!(outcome.hits[0].payload_str("NAME"), Some("Caffeine"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod extract;
pub mod fingerprint;
pub mod index;
pub mod ingest;
pub mod query;
pub mod spectrum;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{ConfigError, PipelineConfig};
    pub use crate::extract::{
        ExtractError, MspReader, PairsReader, SourceFormat, SpectrumSource, TabularColumns,
        TabularReader,
    };
    pub use crate::fingerprint::{transform, transform_arrays, BinWidth, SparseVector};
    pub use crate::index::{GatewayError, Hit, IndexGateway, MemoryGateway, Point};
    pub use crate::ingest::{IngestError, IngestStats, Ingestor};
    pub use crate::query::{QueryBuilder, QueryError, SearchOutcome};
    pub use crate::spectrum::{Metadata, Peak, PointId, SpectrumRecord};
}
