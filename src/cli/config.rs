//! TOML configuration file support.
//!
//! Settings that would otherwise be repeated on every invocation can live in a
//! config file:
//!
//! ```toml
//! # mzvec.toml
//! [fingerprint]
//! bin_width = 0.1
//!
//! [ingest]
//! batch_size = 256
//! id_key = "DB#"
//!
//! [search]
//! limit = 10
//!
//! [index]
//! backend = "qdrant"
//! url = "http://localhost:6333"
//! collection = "ms_spectra"
//! timeout_secs = 120
//! ```
//!
//! Command-line flags take precedence over the file, which takes precedence
//! over built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use mzvec::config::PipelineConfig;
use mzvec::index::{DEFAULT_COLLECTION, DEFAULT_QDRANT_URL, DEFAULT_SERVICE_URL};

/// Default request timeout for index calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which index protocol to speak
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The JSON service shell (`/upsert`, `/search`, `/health`)
    #[default]
    Service,
    /// Qdrant REST API
    Qdrant,
}

impl Backend {
    /// Default endpoint for the backend
    pub fn default_url(self) -> &'static str {
        match self {
            Backend::Service => DEFAULT_SERVICE_URL,
            Backend::Qdrant => DEFAULT_QDRANT_URL,
        }
    }
}

/// Root configuration structure for mzvec.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Fingerprint settings.
    #[serde(default)]
    pub fingerprint: FingerprintSection,

    /// Ingestion settings.
    #[serde(default)]
    pub ingest: IngestSection,

    /// Search settings.
    #[serde(default)]
    pub search: SearchSection,

    /// Index connection settings.
    #[serde(default)]
    pub index: IndexSection,
}

/// `[fingerprint]`
#[derive(Debug, Default, Deserialize)]
pub struct FingerprintSection {
    /// m/z bin width in Th.
    pub bin_width: Option<f64>,
}

/// `[ingest]`
#[derive(Debug, Default, Deserialize)]
pub struct IngestSection {
    /// Spectra per upsert batch.
    pub batch_size: Option<usize>,

    /// Metadata key copied into the payload as `original_id`.
    pub id_key: Option<String>,

    /// Log progress every N spectra.
    pub progress_interval: Option<usize>,
}

/// `[search]`
#[derive(Debug, Default, Deserialize)]
pub struct SearchSection {
    /// Number of hits to return.
    pub limit: Option<usize>,
}

/// `[index]`
#[derive(Debug, Default, Deserialize)]
pub struct IndexSection {
    /// Protocol to use.
    pub backend: Option<Backend>,

    /// Base URL of the service or Qdrant instance.
    pub url: Option<String>,

    /// Collection name (Qdrant backend).
    pub collection: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Resolved index connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    /// Protocol
    pub backend: Backend,
    /// Base URL
    pub url: String,
    /// Collection name
    pub collection: String,
    /// Request timeout
    pub timeout: Duration,
}

/// Index overrides from the command line
#[derive(Debug, Default, Clone)]
pub struct IndexOverrides {
    pub backend: Option<Backend>,
    pub url: Option<String>,
    pub collection: Option<String>,
}

/// Pipeline overrides from the command line
#[derive(Debug, Default, Clone)]
pub struct PipelineOverrides {
    pub bin_width: Option<f64>,
    pub batch_size: Option<usize>,
    pub limit: Option<usize>,
    pub id_key: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Load the file if one was given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Merge flags, file values and defaults into a pipeline configuration.
    pub fn pipeline(&self, overrides: PipelineOverrides) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            bin_width: overrides
                .bin_width
                .or(self.fingerprint.bin_width)
                .unwrap_or(defaults.bin_width),
            batch_size: overrides
                .batch_size
                .or(self.ingest.batch_size)
                .unwrap_or(defaults.batch_size),
            limit: overrides
                .limit
                .or(self.search.limit)
                .unwrap_or(defaults.limit),
            id_key: overrides.id_key.or_else(|| self.ingest.id_key.clone()),
            progress_interval: self
                .ingest
                .progress_interval
                .unwrap_or(defaults.progress_interval),
        }
    }

    /// Merge flags, file values and defaults into index settings.
    pub fn index(&self, overrides: IndexOverrides) -> IndexSettings {
        let backend = overrides
            .backend
            .or(self.index.backend)
            .unwrap_or_default();
        IndexSettings {
            backend,
            url: overrides
                .url
                .or_else(|| self.index.url.clone())
                .unwrap_or_else(|| backend.default_url().to_string()),
            collection: overrides
                .collection
                .or_else(|| self.index.collection.clone())
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            timeout: Duration::from_secs(self.index.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [fingerprint]
            bin_width = 0.01

            [ingest]
            batch_size = 512
            id_key = "DB#"
            progress_interval = 50

            [search]
            limit = 25

            [index]
            backend = "qdrant"
            url = "http://qdrant:6333"
            collection = "gnps"
            timeout_secs = 30
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.fingerprint.bin_width, Some(0.01));
        assert_eq!(config.ingest.batch_size, Some(512));
        assert_eq!(config.ingest.id_key.as_deref(), Some("DB#"));
        assert_eq!(config.search.limit, Some(25));
        assert_eq!(config.index.backend, Some(Backend::Qdrant));

        let pipeline = config.pipeline(PipelineOverrides::default());
        assert_eq!(pipeline.bin_width, 0.01);
        assert_eq!(pipeline.batch_size, 512);
        assert_eq!(pipeline.limit, 25);
        assert_eq!(pipeline.progress_interval, 50);

        let index = config.index(IndexOverrides::default());
        assert_eq!(index.url, "http://qdrant:6333");
        assert_eq!(index.collection, "gnps");
        assert_eq!(index.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config::from_str("[fingerprint]\nbin_width = 0.5\n").unwrap();
        let pipeline = config.pipeline(PipelineOverrides {
            bin_width: Some(0.2),
            ..Default::default()
        });
        assert_eq!(pipeline.bin_width, 0.2);
        assert_eq!(pipeline.batch_size, 256);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.fingerprint.bin_width, None);
        assert_eq!(config.pipeline(PipelineOverrides::default()), PipelineConfig::default());

        let index = config.index(IndexOverrides::default());
        assert_eq!(index.backend, Backend::Service);
        assert_eq!(index.url, "http://localhost:8000");
        assert_eq!(index.collection, "ms_spectra");

        let qdrant = config.index(IndexOverrides {
            backend: Some(Backend::Qdrant),
            ..Default::default()
        });
        assert_eq!(qdrant.url, "http://localhost:6333");
    }
}
