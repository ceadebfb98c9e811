//! Input source table: logical identifiers backed by ordered file lists

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::DataError;

/// How a new path list combines with an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourcePolicy {
    /// Keep existing paths and append new ones (duplicates skipped)
    #[default]
    Append,
    /// Replace the existing list
    Replace,
}

/// On-disk form of the input table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InputFilesDocument {
    #[serde(default)]
    inputs: IndexMap<String, Vec<PathBuf>>,
}

/// Mapping from input identifier to the files backing it
///
/// Order of the paths matters: readers search earlier files first and only
/// fall back to later ones for datasets not found yet.
#[derive(Debug, Clone, Default)]
pub struct InputSourceTable {
    sources: IndexMap<String, Vec<PathBuf>>,
}

impl InputSourceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register files for an identifier
    ///
    /// Returns whether the stored path list changed. The table is left
    /// untouched when the identifier or the path list is empty.
    pub fn add_source<I, P>(&mut self, identifier: &str, paths: I, policy: SourcePolicy) -> Result<bool, DataError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if identifier.is_empty() {
            return Err(DataError::EmptyIdentifier);
        }
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(DataError::NoPaths(identifier.to_string()));
        }

        let entry = self.sources.entry(identifier.to_string()).or_default();
        let before = entry.clone();

        if policy == SourcePolicy::Replace {
            entry.clear();
        }
        for path in paths {
            if !entry.contains(&path) {
                entry.push(path);
            }
        }

        let changed = *entry != before;
        debug!("Input '{}' now backed by {} file(s)", identifier, entry.len());
        Ok(changed)
    }

    /// Append a single file to an identifier
    pub fn add_file(&mut self, identifier: &str, path: impl Into<PathBuf>) -> Result<bool, DataError> {
        self.add_source(identifier, [path.into()], SourcePolicy::Append)
    }

    /// Files backing an identifier
    pub fn paths(&self, identifier: &str) -> Option<&[PathBuf]> {
        self.sources.get(identifier).map(Vec::as_slice)
    }

    /// All identifiers in registration order
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Save the table to a configuration file
    pub fn dump(&self, path: &Path) -> Result<(), DataError> {
        let document = InputFilesDocument {
            inputs: self.sources.clone(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&document)?)?;
        info!("Saved {} input source(s) to {:?}", self.sources.len(), path);
        Ok(())
    }

    /// Merge identifiers from a configuration file
    ///
    /// The file is parsed and validated completely before the table is
    /// touched, so a malformed file leaves the table unchanged. Returns the
    /// identifiers whose path list changed.
    pub fn load(&mut self, path: &Path, policy: SourcePolicy) -> Result<Vec<String>, DataError> {
        let content = fs::read_to_string(path)?;
        let document: InputFilesDocument = serde_json::from_str(&content)?;

        for (identifier, paths) in &document.inputs {
            if identifier.is_empty() {
                return Err(DataError::EmptyIdentifier);
            }
            if paths.is_empty() {
                return Err(DataError::NoPaths(identifier.clone()));
            }
        }

        let mut changed = Vec::new();
        for (identifier, paths) in document.inputs {
            if self.add_source(&identifier, paths, policy)? {
                changed.push(identifier);
            }
        }
        info!("Loaded input sources from {:?} ({} changed)", path, changed.len());
        Ok(changed)
    }
}
