use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use mzvec::extract::{SourceFormat, TabularColumns};

mod config;
mod fingerprint;
mod health;
mod ingest;
mod search;
mod source;

pub use config::{Backend, Config, IndexOverrides, PipelineOverrides};

/// mzvec - Spectral fingerprints for similarity search
#[derive(Parser)]
#[command(name = "mzvec")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Index protocol (service shell or Qdrant REST)
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// Base URL of the index
    #[arg(long, global = true)]
    url: Option<String>,

    /// Collection name (Qdrant backend)
    #[arg(long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Source format override
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    /// Text spectral library
    Msp,
    /// Delimited table with id and JSON-array columns
    Table,
    /// JSON Lines with id and array columns
    Jsonl,
    /// Two-column m/z, intensity text
    Pairs,
}

impl From<FormatArg> for SourceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Msp => SourceFormat::Msp,
            FormatArg::Table => SourceFormat::Table,
            FormatArg::Jsonl => SourceFormat::JsonLines,
            FormatArg::Pairs => SourceFormat::Pairs,
        }
    }
}

/// Options describing the input source
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Input file path
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Source format (inferred from the extension when omitted)
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<FormatArg>,

    /// Identifier column (table/jsonl)
    #[arg(long, default_value = "id")]
    pub id_col: String,

    /// Column with a JSON array of m/z values (table/jsonl)
    #[arg(long, default_value = "mz")]
    pub mz_col: String,

    /// Column with a JSON array of intensities (table/jsonl)
    #[arg(long, default_value = "intensity")]
    pub intensity_col: String,

    /// Read at most this many rows (table/jsonl)
    #[arg(long)]
    pub limit_rows: Option<usize>,

    /// m/z bin width (must match the one used at ingestion)
    #[arg(long)]
    pub bin_width: Option<f64>,
}

impl SourceArgs {
    /// Column selection for tabular sources
    pub fn columns(&self) -> TabularColumns {
        TabularColumns::new(&self.id_col, &self.mz_col, &self.intensity_col)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a spectral library into the index
    Ingest {
        #[command(flatten)]
        source: SourceArgs,

        /// Spectra per upsert batch
        #[arg(short = 'b', long)]
        batch_size: Option<usize>,

        /// Metadata key to also copy into the payload as original_id
        #[arg(long)]
        id_key: Option<String>,
    },

    /// Search the index with a single spectrum
    Search {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of hits to return
        #[arg(short = 'k', long)]
        limit: Option<usize>,
    },

    /// Print fingerprints as JSON lines without contacting the index
    Fingerprint {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Check that the index collection is available
    Health,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let index = config.index(IndexOverrides {
        backend: cli.backend,
        url: cli.url,
        collection: cli.collection,
    });

    match cli.command {
        Commands::Ingest {
            source,
            batch_size,
            id_key,
        } => {
            let pipeline = config.pipeline(PipelineOverrides {
                bin_width: source.bin_width,
                batch_size,
                id_key,
                ..Default::default()
            });
            ingest::run(&source, &pipeline, &index)
        }
        Commands::Search { source, limit } => {
            let pipeline = config.pipeline(PipelineOverrides {
                bin_width: source.bin_width,
                limit,
                ..Default::default()
            });
            search::run(&source, &pipeline, &index)
        }
        Commands::Fingerprint { source } => {
            let pipeline = config.pipeline(PipelineOverrides {
                bin_width: source.bin_width,
                ..Default::default()
            });
            fingerprint::run(&source, &pipeline)
        }
        Commands::Health => health::run(&index),
    }
}
