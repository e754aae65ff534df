//! Ingestion orchestration: records -> fingerprints -> batched upserts.
//!
//! Records are pulled one at a time from an extractor, fingerprinted and
//! appended to a single batch. A full batch is upserted before the next record
//! is pulled, so at most one batch is ever held in memory. Any upsert failure
//! aborts the run: the lazy source cannot be rewound to rebuild the batch.

use std::fmt;

use log::{debug, info};

use crate::config::{ConfigError, PipelineConfig, ORIGINAL_ID_KEY};
use crate::extract::{ExtractError, SpectrumSource};
use crate::fingerprint::{transform, BinWidth};
use crate::index::{GatewayError, IndexGateway, Point};
use crate::spectrum::{PointId, SpectrumRecord};

/// Errors that abort an ingestion run
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The source became unreadable
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// The index rejected an operation
    #[error("index error after {ingested} points ingested: {source}")]
    Gateway {
        /// Points successfully ingested before the failure
        ingested: usize,
        /// Underlying gateway error
        #[source]
        source: GatewayError,
    },
}

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records pulled from the source
    pub records_seen: usize,
    /// Points upserted into the index
    pub points_ingested: usize,
    /// Records dropped because their fingerprint was empty
    pub records_skipped: usize,
    /// Rows the extractor rejected as malformed
    pub malformed_rows: usize,
    /// Upsert calls made
    pub batches_flushed: usize,
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ingested {} spectra in {} batches ({} empty, {} malformed skipped)",
            self.points_ingested, self.batches_flushed, self.records_skipped, self.malformed_rows
        )
    }
}

/// Bounded point buffer, flushed whole.
#[derive(Debug)]
struct Batch {
    points: Vec<Point>,
    capacity: usize,
}

impl Batch {
    fn new(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Drives records from an extractor into an index gateway.
pub struct Ingestor<G> {
    gateway: G,
    bin_width: BinWidth,
    batch_size: usize,
    id_key: Option<String>,
    progress_interval: usize,
}

impl<G: IndexGateway> Ingestor<G> {
    /// Create an ingestor, validating the configuration first.
    pub fn new(gateway: G, config: &PipelineConfig) -> Result<Self, IngestError> {
        let bin_width = config.validate()?;
        Ok(Self {
            gateway,
            bin_width,
            batch_size: config.batch_size,
            id_key: config.id_key.clone(),
            progress_interval: config.progress_interval.max(1),
        })
    }

    /// Bin width used for every fingerprint
    pub fn bin_width(&self) -> BinWidth {
        self.bin_width
    }

    /// Access the gateway
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Consume the ingestor, returning the gateway
    pub fn into_inner(self) -> G {
        self.gateway
    }

    /// Fingerprint a record and build its point, or `None` if the fingerprint
    /// is empty.
    pub fn to_point(&self, record: SpectrumRecord) -> Option<Point> {
        let vector = transform(&record.peaks, self.bin_width);
        if vector.is_empty() {
            return None;
        }

        let mut payload = record.metadata;
        if let Some(key) = &self.id_key {
            if let Some(original) = payload.get(key).cloned() {
                payload.entry(ORIGINAL_ID_KEY.to_string()).or_insert(original);
            }
        }

        let id = record.id.unwrap_or_else(PointId::random);
        Some(Point::new(Some(id), vector, payload))
    }

    /// Ingest every record of an extractor, including its malformed-row count
    /// in the returned statistics.
    pub fn ingest_source<S: SpectrumSource>(&mut self, source: S) -> Result<IngestStats, IngestError> {
        let mut records = source.records();
        let mut stats = self.run(records.by_ref())?;
        stats.malformed_rows = records.source().skipped();
        info!("{}", stats);
        Ok(stats)
    }

    /// Ingest a stream of records.
    pub fn ingest<I>(&mut self, records: I) -> Result<IngestStats, IngestError>
    where
        I: IntoIterator<Item = Result<SpectrumRecord, ExtractError>>,
    {
        let stats = self.run(records)?;
        info!("{}", stats);
        Ok(stats)
    }

    fn run<I>(&mut self, records: I) -> Result<IngestStats, IngestError>
    where
        I: IntoIterator<Item = Result<SpectrumRecord, ExtractError>>,
    {
        self.gateway
            .ensure_collection()
            .map_err(|source| IngestError::Gateway { ingested: 0, source })?;

        let mut stats = IngestStats::default();
        let mut batch = Batch::new(self.batch_size);

        for record in records {
            let record = record?;
            stats.records_seen += 1;

            match self.to_point(record) {
                Some(point) => batch.push(point),
                None => {
                    stats.records_skipped += 1;
                    continue;
                }
            }

            if batch.is_full() {
                self.flush(&mut batch, &mut stats)?;
            }
        }

        if !batch.is_empty() {
            self.flush(&mut batch, &mut stats)?;
        }

        Ok(stats)
    }

    fn flush(&mut self, batch: &mut Batch, stats: &mut IngestStats) -> Result<(), IngestError> {
        let count = batch.points.len();
        debug!("Flushing batch of {} points", count);

        self.gateway
            .upsert(&batch.points)
            .map_err(|source| IngestError::Gateway {
                ingested: stats.points_ingested,
                source,
            })?;
        batch.points.clear();

        let before = stats.points_ingested;
        stats.points_ingested += count;
        stats.batches_flushed += 1;

        if stats.points_ingested / self.progress_interval > before / self.progress_interval {
            info!("Progress: {} spectra", stats.points_ingested);
        }

        Ok(())
    }
}
