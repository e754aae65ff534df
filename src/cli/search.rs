use anyhow::{Context, Result};

use mzvec::config::PipelineConfig;
use mzvec::extract::{SourceFormat, SpectrumSource};
use mzvec::index::Hit;
use mzvec::query::{QueryBuilder, QueryError};

use super::config::IndexSettings;
use super::{source, SourceArgs};

/// Search the index with the first spectrum of the input
pub fn run(args: &SourceArgs, pipeline: &PipelineConfig, index: &IndexSettings) -> Result<()> {
    let format = source::resolve_format(args, SourceFormat::Pairs)?;
    let builder = QueryBuilder::new(pipeline).context("Invalid search settings")?;

    let mut reader = source::open(args, format)?;
    let peaks = reader
        .next_record()
        .with_context(|| format!("Failed to read {}", args.input.display()))?
        .map(|record| record.peaks)
        .unwrap_or_default();

    let gateway = source::gateway(index);
    match builder.search(&gateway, &peaks) {
        Ok(outcome) => {
            for (rank, hit) in outcome.hits.iter().enumerate() {
                println!("{}", format_hit(rank + 1, hit));
            }
            Ok(())
        }
        Err(QueryError::EmptyFingerprint) => {
            println!("Empty spectrum after binning; nothing to search.");
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Search failed"),
    }
}

fn format_hit(rank: usize, hit: &Hit) -> String {
    let name = hit.payload_str("NAME").unwrap_or("None");

    #[cfg(feature = "colorized_output")]
    {
        use console::style;
        format!(
            "{}. id={} score={} name={}",
            rank,
            hit.id,
            style(format!("{:.6}", hit.score)).green(),
            style(name).bold()
        )
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        format!("{}. id={} score={:.6} name={}", rank, hit.id, hit.score, name)
    }
}
