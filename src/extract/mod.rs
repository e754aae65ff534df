//! Peak-list extractors.
//!
//! Each supported source format has a reader implementing [`SpectrumSource`],
//! a pull-based, single-pass producer of [`SpectrumRecord`]s:
//!
//! - [`MspReader`]: line-oriented text spectral libraries (`.msp`)
//! - [`TabularReader`]: rows with an id column and two JSON-array columns,
//!   read from a delimited table or JSON Lines
//! - [`PairsReader`]: two-column delimited text (m/z, intensity)
//!
//! Malformed records are skipped inside the readers; only errors that make the
//! rest of the source unreadable (I/O, missing columns) are returned.

use std::path::Path;

use crate::spectrum::SpectrumRecord;

mod msp;
mod pairs;
mod tabular;

pub use msp::{MspReader, ParseState};
pub use pairs::PairsReader;
pub use tabular::{decode_array, JsonLinesRows, TabularColumns, TabularReader, TabularRow, TableRows};

/// Maximum number of characters of an undecodable value kept for diagnostics
pub const DECODE_PREVIEW_CHARS: usize = 80;

/// Errors that can occur during extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// I/O error reading the source
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV/TSV parsing error
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON parsing error for a whole row
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Required column not present in the table header
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Cell could not be decoded as an array of numbers
    #[error("Failed to parse JSON array: {reason}; value starts with: {preview}")]
    Decode {
        /// Underlying cause
        reason: String,
        /// First characters of the offending value
        preview: String,
    },

    /// Row is structurally invalid (e.g. unequal array lengths)
    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

/// A producer of spectrum records.
///
/// Sources are finite and not restartable: each call advances a single forward
/// pass over the underlying input.
pub trait SpectrumSource {
    /// Pull the next record, or `None` once the source is exhausted.
    fn next_record(&mut self) -> Result<Option<SpectrumRecord>, ExtractError>;

    /// Number of malformed records skipped so far
    fn skipped(&self) -> usize {
        0
    }

    /// Adapt the source into an iterator of records.
    fn records(self) -> Records<Self>
    where
        Self: Sized,
    {
        Records { source: self }
    }
}

impl<S: SpectrumSource + ?Sized> SpectrumSource for Box<S> {
    fn next_record(&mut self) -> Result<Option<SpectrumRecord>, ExtractError> {
        (**self).next_record()
    }

    fn skipped(&self) -> usize {
        (**self).skipped()
    }
}

/// Iterator over the records of a [`SpectrumSource`]
pub struct Records<S> {
    source: S,
}

impl<S> Records<S> {
    /// Access the wrapped source (e.g. to read its skip counter)
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: SpectrumSource> Iterator for Records<S> {
    type Item = Result<SpectrumRecord, ExtractError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.source.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Supported source formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Text spectral library
    Msp,
    /// Delimited table with id and JSON-array columns
    Table,
    /// JSON Lines with id and array columns
    JsonLines,
    /// Two-column m/z, intensity text
    Pairs,
}

impl SourceFormat {
    /// Guess the format of a spectral library from its file extension.
    ///
    /// Plain `.csv`/`.tsv` files are ambiguous between a spectrum table and a
    /// two-column peak list; `delimited_default` decides which is meant.
    pub fn from_path(path: &Path, delimited_default: SourceFormat) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "msp" => Some(SourceFormat::Msp),
            "jsonl" | "ndjson" => Some(SourceFormat::JsonLines),
            "csv" | "tsv" | "txt" => Some(delimited_default),
            _ => None,
        }
    }
}

/// Field delimiter for a delimited file: tab for `.tsv`, comma otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

/// Truncate a value to the diagnostic preview length (character-aware).
pub(crate) fn preview(value: &str) -> String {
    value.chars().take(DECODE_PREVIEW_CHARS).collect()
}
