use anyhow::{Context, Result};

use mzvec::index::CollectionStatus;

use super::config::IndexSettings;
use super::source;

/// Probe the index collection
pub fn run(index: &IndexSettings) -> Result<()> {
    let gateway = source::gateway(index);
    let status = gateway
        .get_collection()
        .with_context(|| format!("Failed to reach index at {}", index.url))?;

    match status {
        CollectionStatus::Ready => {
            println!("ok: collection {} is available", index.collection);
            Ok(())
        }
        CollectionStatus::NotFound => {
            println!("degraded: collection {} not found", index.collection);
            std::process::exit(1);
        }
    }
}
