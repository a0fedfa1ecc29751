pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod transform;
pub mod writer;

pub use cli::Cli;
pub use engine::{acquire_engine, Engine, EngineConfig, TableLocation, WrittenTable};
pub use error::EtlError;
pub use pipeline::{run, run_with, RunSummary};
