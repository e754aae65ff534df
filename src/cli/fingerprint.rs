use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, BufWriter, Write};

use mzvec::config::PipelineConfig;
use mzvec::extract::{SourceFormat, SpectrumSource};
use mzvec::fingerprint::{transform, SparseVector};
use mzvec::spectrum::{Metadata, PointId};

use super::{source, SourceArgs};

/// One output line
#[derive(Serialize)]
struct FingerprintLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a PointId>,
    #[serde(skip_serializing_if = "Metadata::is_empty")]
    metadata: &'a Metadata,
    sparse: &'a SparseVector,
}

/// Print the fingerprint of every record as a JSON line
pub fn run(args: &SourceArgs, pipeline: &PipelineConfig) -> Result<()> {
    let bin_width = pipeline.validate().context("Invalid fingerprint settings")?;
    let format = source::resolve_format(args, SourceFormat::Pairs)?;
    let reader = source::open(args, format)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut empty = 0usize;

    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read {}", args.input.display()))?;
        let sparse = transform(&record.peaks, bin_width);
        if sparse.is_empty() {
            empty += 1;
            continue;
        }

        let line = FingerprintLine {
            id: record.id.as_ref(),
            metadata: &record.metadata,
            sparse: &sparse,
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }
    out.flush()?;

    if empty > 0 {
        eprintln!("Skipped {} records with empty fingerprints", empty);
    }

    Ok(())
}
