use anyhow::{Context, Result};
use star_schema_etl::{cli::Cli, config::Settings, logging::init_logging, pipeline};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(&cli.log_level);

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let start = Instant::now();
    let summary = pipeline::run(&settings).await?;
    let elapsed = start.elapsed();

    println!(
        "\nWrote {} rows to {} ({} items, {} entities, {} actors, {} time rows, {} plays) in {:.1}s",
        summary.total_rows(),
        pipeline::DEST_URI,
        summary.items,
        summary.entities,
        summary.events.actors,
        summary.events.time_rows,
        summary.events.fact_rows,
        elapsed.as_secs_f64()
    );
    if summary.events.unmatched > 0 {
        println!(
            "{} plays had no matching catalog item and were left out of the fact table",
            summary.events.unmatched
        );
    }

    Ok(())
}
