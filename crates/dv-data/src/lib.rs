//! Data handling for the plotting framework
//!
//! Input sources map logical identifiers to files, readers pull named
//! datasets out of those files, and the ledger keeps every dataset that was
//! already read (or found missing) so that it is never read twice.

pub mod cache;
pub mod config;
pub mod memory;
pub mod planner;
pub mod schema;
pub mod sources;

use std::path::PathBuf;

use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use thiserror::Error;

// Re-exports
pub use cache::{Ledger, LoadReport, LoadedDataKey};
pub use config::{InputSourceTable, NullConfig, SourcePolicy};
pub use planner::{LoadPlanner, RequiredData};
pub use sources::{
    ContainerSource, CsvSource, DataReader, FileReader, ReadOutcome, SourceKind,
};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Configuration file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input identifier must not be empty")]
    EmptyIdentifier,

    #[error("No input files given for '{0}'")]
    NoPaths(String),

    #[error(transparent)]
    Core(#[from] dv_core::CoreError),

    #[error("Unsupported input file type: {}", .0.display())]
    UnsupportedFile(PathBuf),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<rusqlite::Error> for DataError {
    fn from(error: rusqlite::Error) -> Self {
        DataError::Container(error.to_string())
    }
}

/// One loaded dataset, exclusively owned by the ledger
#[derive(Debug, Clone)]
pub struct DataHandle {
    /// Dataset name as requested
    pub name: String,
    /// File the dataset was read from
    pub origin: PathBuf,
    /// Dataset contents
    pub batch: RecordBatch,
}

impl DataHandle {
    pub fn new(name: impl Into<String>, origin: impl Into<PathBuf>, batch: RecordBatch) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            batch,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}
