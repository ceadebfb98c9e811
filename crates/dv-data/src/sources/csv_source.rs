//! CSV input files: each file holds exactly one dataset

use std::fs;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use tracing::debug;

use crate::config::NullConfig;
use crate::schema::SchemaDetector;
use crate::{DataError, DataHandle};

/// Rows used for type detection
const MAX_SAMPLE_ROWS: usize = 5000;

/// CSV data source
pub struct CsvSource {
    path: PathBuf,
    nulls: NullConfig,
    delimiter: u8,
}

impl CsvSource {
    /// Open a CSV source, failing if the file is not there
    pub fn open(path: &Path, nulls: NullConfig) -> Result<Self, DataError> {
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(DataError::Other(format!("{:?} is not a file", path)));
        }
        Ok(Self {
            path: path.to_path_buf(),
            nulls,
            delimiter: Self::sniff_delimiter(path),
        })
    }

    /// Name of the dataset this file provides
    pub fn dataset_name(&self) -> String {
        self.path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    /// `.txt` inputs are usually whitespace or tab separated
    fn sniff_delimiter(path: &Path) -> u8 {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") => b'\t',
            _ => b',',
        }
    }

    /// Read the whole file into a dataset
    pub fn read(&self) -> Result<DataHandle, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() {
            return Err(DataError::Csv(format!("{:?} has no header row", self.path)));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }

        let detector = SchemaDetector::new()
            .with_sample_size(MAX_SAMPLE_ROWS)
            .with_nulls(self.nulls.clone());
        let schema = detector.detect(&headers, &rows);
        let batch = detector.build_batch(schema, &rows)?;

        debug!("Read {} rows from {:?}", batch.num_rows(), self.path);
        Ok(DataHandle::new(self.dataset_name(), self.path.clone(), batch))
    }
}
