use clap::Parser;
use std::path::PathBuf;

/// Reshape the event log and item catalog into a partitioned Parquet star schema
#[derive(Parser, Debug)]
#[command(name = "star-schema-etl")]
#[command(version, about)]
pub struct Cli {
    /// Settings file (default: ./dl.cfg, then the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "star_schema_etl=debug" (RUST_LOG wins when set)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
