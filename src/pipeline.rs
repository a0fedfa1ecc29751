use anyhow::{Context, Result};
use tracing::info;

use crate::config::{DatasetPaths, Settings};
use crate::engine::{acquire_engine, Engine, EngineConfig};
use crate::transform::{transform_catalog, transform_events, EventSummary};

/// Where the raw datasets live
pub const SOURCE_URI: &str = "data/";

/// Where the star schema tables are written
pub const DEST_URI: &str = "output/";

/// Row counts of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub catalog_records: usize,
    pub items: usize,
    pub entities: usize,
    pub events: EventSummary,
}

impl RunSummary {
    /// Rows written across all five tables
    pub fn total_rows(&self) -> usize {
        self.items + self.entities + self.events.actors + self.events.time_rows + self.events.fact_rows
    }
}

/// Provision the engine and run both stages against the fixed locations
pub async fn run(settings: &Settings) -> Result<RunSummary> {
    let engine = acquire_engine(EngineConfig::from_settings(settings))
        .context("Failed to acquire execution engine")?;

    run_with(&engine, SOURCE_URI, DEST_URI, &settings.paths).await
}

/// Catalog transform, then event transform. A failure in the first stage
/// stops the run before the second starts.
pub async fn run_with(
    engine: &Engine,
    source_uri: &str,
    dest_uri: &str,
    paths: &DatasetPaths,
) -> Result<RunSummary> {
    info!(source = source_uri, dest = dest_uri, "starting run");

    let catalog = transform_catalog(engine, source_uri, dest_uri, &paths.catalog_path)
        .await
        .context("Catalog transform failed")?;

    let events = transform_events(engine, source_uri, dest_uri, &paths.log_path, &catalog.items)
        .await
        .context("Event transform failed")?;

    Ok(RunSummary {
        catalog_records: catalog.records,
        items: catalog.items.rows(),
        entities: catalog.entities.stats.rows,
        events,
    })
}
