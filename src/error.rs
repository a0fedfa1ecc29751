use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use thiserror::Error;

/// Failures raised by the pipeline library.
///
/// Every variant is fatal for the run: nothing in the pipeline retries.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("no storage connector registered for scheme '{scheme}' ({uri})")]
    UnsupportedScheme { scheme: String, uri: String },

    #[error("no input objects match {0}")]
    SourceNotFound(String),

    #[error("malformed record in {key} at line {line}: {reason}")]
    MalformedRecord {
        key: String,
        line: usize,
        reason: String,
    },

    #[error("table not found at {0} (has the producing stage run?)")]
    TableNotFound(String),

    #[error("table {0} has no unique key")]
    NoUniqueKey(&'static str),

    #[error(transparent)]
    Storage(#[from] object_store::Error),

    #[error(transparent)]
    DataFusion(#[from] DataFusionError),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

impl From<config::ConfigError> for EtlError {
    fn from(err: config::ConfigError) -> Self {
        EtlError::Config(err.to_string())
    }
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
