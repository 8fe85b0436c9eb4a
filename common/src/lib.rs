use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use parquet::errors::ParquetError;
use thiserror::Error;

pub mod config;
pub mod telemetry;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("DataFusion error: {0}")]
    DataFusion(#[from] DataFusionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Unknown report: {0}")]
    UnknownReport(String),

    #[error("Warehouse model has not been built yet")]
    ModelNotBuilt,

    #[error("Rebuild of generation {generation} failed: {source}")]
    RebuildFailed {
        generation: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn rebuild_failed(generation: u64, source: Error) -> Self {
        Error::RebuildFailed {
            generation,
            source: Box::new(source),
        }
    }
}
