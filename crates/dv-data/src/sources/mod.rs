//! Readers that pull named datasets out of input files

pub mod container_source;
pub mod csv_source;

pub use container_source::ContainerSource;
pub use csv_source::CsvSource;

use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::config::NullConfig;
use crate::{DataError, DataHandle};

/// Result of one batched read over the files of an input source
#[derive(Debug, Default)]
pub struct ReadOutcome {
    /// Datasets found, keyed by requested name
    pub found: AHashMap<String, DataHandle>,
    /// Files that could not be read; the remaining files were still searched
    pub file_errors: Vec<(PathBuf, DataError)>,
}

/// File-reading collaborator used by the ledger
pub trait DataReader {
    /// Read the requested datasets from an ordered list of files
    fn read(&mut self, paths: &[PathBuf], names: &[String]) -> ReadOutcome;
}

/// Kind of input file, selected from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// One dataset per file, named by the file stem
    Csv,
    /// SQLite container holding one table per dataset
    Container,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" | "txt" => Some(SourceKind::Csv),
            "db" | "sqlite" | "sqlite3" => Some(SourceKind::Container),
            _ => None,
        }
    }
}

/// Default reader dispatching on [`SourceKind`]
///
/// Earlier files win: a later file is only asked for the names that no
/// earlier file provided.
#[derive(Debug, Clone, Default)]
pub struct FileReader {
    nulls: NullConfig,
}

impl FileReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nulls(nulls: NullConfig) -> Self {
        Self { nulls }
    }

    fn read_file(&self, path: &Path, names: &[&String]) -> Result<Vec<DataHandle>, DataError> {
        match SourceKind::from_path(path) {
            Some(SourceKind::Csv) => {
                let source = CsvSource::open(path, self.nulls.clone())?;
                if names.iter().any(|n| **n == source.dataset_name()) {
                    Ok(vec![source.read()?])
                } else {
                    Ok(Vec::new())
                }
            }
            Some(SourceKind::Container) => {
                let source = ContainerSource::open(path)?;
                let mut found = Vec::new();
                for name in names {
                    if let Some(handle) = source.read_dataset(name)? {
                        found.push(handle);
                    }
                }
                Ok(found)
            }
            None => Err(DataError::UnsupportedFile(path.to_path_buf())),
        }
    }
}

impl DataReader for FileReader {
    fn read(&mut self, paths: &[PathBuf], names: &[String]) -> ReadOutcome {
        let mut outcome = ReadOutcome::default();
        let mut remaining: Vec<&String> = names.iter().collect();

        for path in paths {
            if remaining.is_empty() {
                break;
            }
            match self.read_file(path, &remaining) {
                Ok(handles) => {
                    debug!("Found {} dataset(s) in {:?}", handles.len(), path);
                    for handle in handles {
                        remaining.retain(|n| **n != handle.name);
                        outcome.found.insert(handle.name.clone(), handle);
                    }
                }
                Err(e) => {
                    warn!("Failed to read {:?}: {}", path, e);
                    outcome.file_errors.push((path.clone(), e));
                }
            }
        }

        outcome
    }
}
