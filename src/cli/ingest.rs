use anyhow::{Context, Result};
use log::info;

use mzvec::config::PipelineConfig;
use mzvec::extract::SourceFormat;
use mzvec::ingest::Ingestor;

use super::config::IndexSettings;
use super::{source, SourceArgs};

/// Ingest a spectral library into the index
pub fn run(args: &SourceArgs, pipeline: &PipelineConfig, index: &IndexSettings) -> Result<()> {
    let format = source::resolve_format(args, SourceFormat::Table)?;

    info!("mzvec ingest");
    info!("============");
    info!("Input:      {}", args.input.display());
    info!("Bin width:  {}", pipeline.bin_width);
    info!("Batch size: {}", pipeline.batch_size);
    if let Some(key) = &pipeline.id_key {
        info!("Id key:     {}", key);
    }

    let mut ingestor =
        Ingestor::new(source::gateway(index), pipeline).context("Invalid ingestion settings")?;
    let reader = source::open(args, format)?;

    let stats = ingestor.ingest_source(reader).context("Ingestion failed")?;

    println!(
        "Ingested {} spectra from {}",
        stats.points_ingested,
        args.input.display()
    );
    if stats.records_skipped > 0 || stats.malformed_rows > 0 {
        println!(
            "  skipped {} empty and {} malformed records",
            stats.records_skipped, stats.malformed_rows
        );
    }

    Ok(())
}
