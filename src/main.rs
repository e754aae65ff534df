//! # mzvec
//!
//! A command-line tool for turning mass spectra into sparse fingerprints and
//! loading them into a vector similarity index.
//!
//! ## Supported Input Formats
//!
//! - **MSP**: text spectral libraries (`NAME:`/`Num Peaks:` records)
//! - **Table**: CSV/TSV rows with an id and JSON-array `mz`/`intensity` columns
//! - **JSON Lines**: one object per line with the same columns
//! - **Pairs**: two-column m/z, intensity text (query spectra)
//!
//! ## Usage
//!
//! ```bash
//! # Load a library into the index service
//! mzvec ingest library.msp --url http://localhost:8000
//!
//! # Search with a single spectrum
//! mzvec search query.tsv -k 5
//!
//! # Inspect fingerprints offline
//! mzvec fingerprint library.msp --bin-width 0.01
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity
    cli::init_logging(cli.verbosity());

    cli::dispatch(cli)
}
