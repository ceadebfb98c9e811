//! Data ledger: every dataset loaded (or found missing) by the manager
//!
//! A key is recorded as present after the first read attempt whether or not
//! a dataset came back, so a missing dataset costs one file scan per process
//! instead of one per plot referencing it.

use std::path::PathBuf;

use ahash::{AHashMap, AHashSet};
use dv_core::{NameId, NameRegistry};
use tracing::{debug, info, warn};

use crate::config::InputSourceTable;
use crate::memory::{estimate_batch_memory, format_bytes};
use crate::planner::RequiredData;
use crate::sources::DataReader;
use crate::{DataError, DataHandle};

/// Ledger key: (input source, dataset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadedDataKey {
    pub source: NameId,
    pub dataset: NameId,
}

impl LoadedDataKey {
    pub fn new(source: NameId, dataset: NameId) -> Self {
        Self { source, dataset }
    }
}

/// A file that failed during a batched read
#[derive(Debug, Clone, PartialEq)]
pub struct FileFailure {
    pub input: String,
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of one `ensure_loaded` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// (input, dataset) pairs read in this call
    pub loaded: Vec<(String, String)>,
    /// (input, dataset) pairs found in none of the input's files
    pub missing: Vec<(String, String)>,
    pub file_errors: Vec<FileFailure>,
    /// Number of batched read requests issued
    pub reads: usize,
}

impl LoadReport {
    /// Fold another report into this one
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.missing.extend(other.missing);
        self.file_errors.extend(other.file_errors);
        self.reads += other.reads;
    }
}

/// Owner of all loaded dataset handles
///
/// Every key in `handles` is also in `present`; a key only in `present`
/// is a cached "not found".
#[derive(Debug, Default)]
pub struct Ledger {
    handles: AHashMap<LoadedDataKey, DataHandle>,
    present: AHashSet<LoadedDataKey>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure every required dataset has been looked up once
    ///
    /// Issues at most one read per input source, asking only for the
    /// datasets not looked up before. Missing datasets and unreadable files
    /// are reported, never fatal.
    pub fn ensure_loaded(
        &mut self,
        required: &RequiredData,
        names: &NameRegistry,
        inputs: &InputSourceTable,
        reader: &mut dyn DataReader,
    ) -> Result<LoadReport, DataError> {
        let mut report = LoadReport::default();

        for (source, datasets) in required {
            let pending: Vec<NameId> = datasets
                .iter()
                .copied()
                .filter(|dataset| !self.present.contains(&LoadedDataKey::new(*source, *dataset)))
                .collect();

            let identifier = names.name_for(*source)?;
            if pending.is_empty() {
                debug!("All {} dataset(s) of '{}' already in ledger", datasets.len(), identifier);
                continue;
            }

            let dataset_names = pending
                .iter()
                .map(|d| names.name_for(*d).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;

            let mut outcome = match inputs.paths(identifier) {
                Some(paths) => {
                    info!(
                        "Reading {} dataset(s) for '{}' from {} file(s)",
                        dataset_names.len(),
                        identifier,
                        paths.len()
                    );
                    report.reads += 1;
                    reader.read(paths, &dataset_names)
                }
                None => {
                    warn!("No input files registered for '{}'", identifier);
                    Default::default()
                }
            };

            for (path, error) in outcome.file_errors.drain(..) {
                report.file_errors.push(FileFailure {
                    input: identifier.to_string(),
                    path,
                    message: error.to_string(),
                });
            }

            for (dataset, name) in pending.into_iter().zip(dataset_names) {
                let key = LoadedDataKey::new(*source, dataset);
                self.present.insert(key);
                match outcome.found.remove(&name) {
                    Some(handle) => {
                        self.handles.insert(key, handle);
                        report.loaded.push((identifier.to_string(), name));
                    }
                    None => {
                        warn!("Dataset '{}' not found in input '{}'", name, identifier);
                        report.missing.push((identifier.to_string(), name));
                    }
                }
            }
        }

        if report.reads > 0 {
            info!(
                "Ledger holds {} dataset(s), {}",
                self.handles.len(),
                format_bytes(self.memory_usage())
            );
        }
        Ok(report)
    }

    /// Borrow a loaded dataset
    pub fn get(&self, key: &LoadedDataKey) -> Option<&DataHandle> {
        self.handles.get(key)
    }

    /// Whether the key was looked up before (found or not)
    pub fn is_resident(&self, key: &LoadedDataKey) -> bool {
        self.present.contains(key)
    }

    /// Whether the key was looked up and not found
    pub fn is_missing(&self, key: &LoadedDataKey) -> bool {
        self.present.contains(key) && !self.handles.contains_key(key)
    }

    /// Number of loaded datasets
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of keys looked up, including negative results
    pub fn tracked(&self) -> usize {
        self.present.len()
    }

    /// Estimated memory held by loaded datasets
    pub fn memory_usage(&self) -> usize {
        self.handles.values().map(|h| estimate_batch_memory(&h.batch)).sum()
    }

    /// Forget every dataset of one input source
    pub fn evict_source(&mut self, source: NameId) -> usize {
        let before = self.present.len();
        self.present.retain(|key| key.source != source);
        self.handles.retain(|key, _| key.source != source);
        before - self.present.len()
    }

    /// Drop every dataset and negative result
    pub fn clear(&mut self) {
        info!("Clearing {} loaded dataset(s)", self.handles.len());
        self.handles.clear();
        self.present.clear();
    }
}
