use anyhow::{Context, Result};
use log::info;

use mzvec::extract::{
    delimiter_for, JsonLinesRows, MspReader, PairsReader, SourceFormat, SpectrumSource,
    TableRows, TabularReader,
};
use mzvec::index::{IndexGateway, QdrantGateway, ServiceGateway};

use super::config::{Backend, IndexSettings};
use super::SourceArgs;

/// Resolve the source format, falling back to the extension.
pub fn resolve_format(args: &SourceArgs, delimited_default: SourceFormat) -> Result<SourceFormat> {
    match args.format {
        Some(format) => Ok(format.into()),
        None => SourceFormat::from_path(&args.input, delimited_default).with_context(|| {
            format!(
                "Cannot infer source format of {}; pass --format",
                args.input.display()
            )
        }),
    }
}

/// Open the input as a spectrum source.
pub fn open(args: &SourceArgs, format: SourceFormat) -> Result<Box<dyn SpectrumSource>> {
    if !args.input.exists() {
        anyhow::bail!("Input file does not exist: {}", args.input.display());
    }

    let path = &args.input;
    info!("Reading {} as {:?}", path.display(), format);

    let source: Box<dyn SpectrumSource> = match format {
        SourceFormat::Msp => Box::new(
            MspReader::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        SourceFormat::Pairs => Box::new(
            PairsReader::open(path, delimiter_for(path))
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        SourceFormat::Table => {
            let rows = TableRows::open(path, delimiter_for(path), &args.columns())
                .with_context(|| format!("Failed to read table header of {}", path.display()))?;
            Box::new(with_limit(TabularReader::new(rows), args.limit_rows))
        }
        SourceFormat::JsonLines => {
            let rows = JsonLinesRows::open(path, &args.columns())
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Box::new(with_limit(TabularReader::new(rows), args.limit_rows))
        }
    };

    Ok(source)
}

fn with_limit<I>(reader: TabularReader<I>, limit: Option<usize>) -> TabularReader<I>
where
    I: Iterator<Item = Result<mzvec::extract::TabularRow, mzvec::extract::ExtractError>>,
{
    match limit {
        Some(limit) => reader.with_limit(limit),
        None => reader,
    }
}

/// Build the gateway selected by the settings.
pub fn gateway(settings: &IndexSettings) -> Box<dyn IndexGateway> {
    info!("Index: {:?} at {}", settings.backend, settings.url);
    match settings.backend {
        Backend::Service => Box::new(ServiceGateway::new(&settings.url, settings.timeout)),
        Backend::Qdrant => Box::new(QdrantGateway::new(
            &settings.url,
            &settings.collection,
            settings.timeout,
        )),
    }
}
