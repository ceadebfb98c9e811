//! Plot definition files
//!
//! A plot file is a JSON document holding templates and plots. Dumps are
//! self-contained: every template referenced by a dumped plot is written
//! alongside it.

use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use dv_core::{ExtractMode, PatternSelection, PlotDefinition, PlotId, PlotSelection, PlotTemplate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::PlotStore;
use crate::StoreError;

/// On-disk plot definition document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotFile {
    #[serde(default)]
    pub templates: Vec<PlotTemplate>,
    #[serde(default)]
    pub plots: Vec<PlotDefinition>,
}

impl PlotFile {
    /// Parse a plot file
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the document, creating parent directories
    pub fn write(&self, path: &Path) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)
    }

    pub fn template(&self, name: &str) -> Option<&PlotTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// Parsed plot files kept for the lifetime of a manager
#[derive(Debug, Default, Clone)]
pub struct PlotFileCache {
    files: AHashMap<PathBuf, PlotFile>,
}

impl PlotFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a file on first access, then serve it from memory
    pub fn load(&mut self, path: &Path) -> Result<&PlotFile, StoreError> {
        if !self.files.contains_key(path) {
            let file = PlotFile::read(path)?;
            info!(
                "Read {} plot(s) and {} template(s) from {:?}",
                file.plots.len(),
                file.templates.len(),
                path
            );
            self.files.insert(path.to_path_buf(), file);
        }
        Ok(&self.files[path])
    }

    /// Forget a cached file, e.g. after it was rewritten
    pub fn invalidate(&mut self, path: &Path) {
        self.files.remove(path);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// What an extraction found or added
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractReport {
    pub mode: ExtractMode,
    /// Plots in the file matching the selection
    pub found: Vec<PlotId>,
    /// Plots added to the store (load mode)
    pub added: Vec<PlotId>,
    /// Matching plots already booked in the store
    pub duplicates: Vec<PlotId>,
    /// Name patterns that matched nothing
    pub unmatched_patterns: Vec<String>,
    /// Templates referenced by matching plots but defined nowhere
    pub missing_templates: Vec<String>,
}

impl ExtractReport {
    fn new(mode: ExtractMode) -> Self {
        Self {
            mode,
            found: Vec::new(),
            added: Vec::new(),
            duplicates: Vec::new(),
            unmatched_patterns: Vec::new(),
            missing_templates: Vec::new(),
        }
    }
}

impl PlotStore {
    /// Build a self-contained plot file from the selected plots
    pub fn to_plot_file(&self, selection: &PlotSelection) -> PlotFile {
        let plots: Vec<PlotDefinition> = self.select(selection).into_iter().cloned().collect();

        let mut templates: Vec<PlotTemplate> = Vec::new();
        for name in plots.iter().filter_map(|p| p.template.as_deref()) {
            if templates.iter().any(|t| t.name == name) {
                continue;
            }
            if let Some(template) = self.template(name) {
                templates.push(template.clone());
            }
        }

        PlotFile { templates, plots }
    }

    /// Write the selected plots to a plot file; returns the number written
    pub fn dump_plots(&self, path: &Path, selection: &PlotSelection) -> Result<usize, StoreError> {
        let file = self.to_plot_file(selection);
        file.write(path)?;
        info!("Dumped {} plot(s) to {:?}", file.plots.len(), path);
        Ok(file.plots.len())
    }

    /// Load or find plots of a parsed plot file matching a pattern selection
    ///
    /// In load mode matching plots are added together with the templates
    /// they reference; already booked plots are reported, not overwritten.
    /// Find mode never modifies the store.
    pub fn extract_plots(
        &mut self,
        file: &PlotFile,
        selection: &PatternSelection,
        mode: ExtractMode,
    ) -> ExtractReport {
        let mut report = ExtractReport::new(mode);
        let matching: Vec<&PlotDefinition> =
            file.plots.iter().filter(|p| selection.matches(&p.id)).collect();

        report.found = matching.iter().map(|p| p.id.clone()).collect();
        report.unmatched_patterns = selection.unmatched_names(report.found.iter());
        for pattern in &report.unmatched_patterns {
            warn!("No plot matching '{}' in plot file", pattern);
        }

        match mode {
            ExtractMode::Find => {
                for id in &report.found {
                    info!("Found plot {}", id);
                }
            }
            ExtractMode::Load => {
                for plot in matching {
                    if let Some(name) = plot.template.as_deref() {
                        self.import_template(file, name, &mut report);
                    }
                    match self.add_plot(plot.clone()) {
                        Ok(()) => report.added.push(plot.id.clone()),
                        Err(e) => {
                            warn!("{}", e);
                            report.duplicates.push(plot.id.clone());
                        }
                    }
                }
                info!("Loaded {} plot(s) from plot file", report.added.len());
            }
        }

        report
    }

    fn import_template(&mut self, file: &PlotFile, name: &str, report: &mut ExtractReport) {
        if self.has_template(name) {
            return;
        }
        match file.template(name) {
            Some(template) => {
                if let Err(e) = self.add_template(template.clone()) {
                    warn!("{}", e);
                }
            }
            None => {
                if !report.missing_templates.iter().any(|t| t == name) {
                    warn!("Template '{}' is not defined in the plot file", name);
                    report.missing_templates.push(name.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_core::{DataRef, PlotProperties};

    fn populated_store() -> PlotStore {
        let mut store = PlotStore::new();
        store
            .add_template(PlotTemplate::new("spectrum").with_properties(PlotProperties {
                log_y: Some(true),
                ..Default::default()
            }))
            .unwrap();
        store.add_template(PlotTemplate::new("unused")).unwrap();
        store
            .add_plot(
                PlotDefinition::new("QA", "Tracking", "pt")
                    .with_template("spectrum")
                    .with_data(DataRef::new("run1", "histPt")),
            )
            .unwrap();
        store
            .add_plot(PlotDefinition::new("QA", "Tracking", "eta").with_data(DataRef::new("run1", "histEta")))
            .unwrap();
        store
            .add_plot(PlotDefinition::new("Results", "Spectra", "pt").with_data(DataRef::new("run2", "histPt")))
            .unwrap();
        store
    }

    #[test]
    fn test_dump_is_self_contained() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots").join("qa.json");
        let store = populated_store();

        let written = store.dump_plots(&path, &PlotSelection::all().group("QA")).unwrap();
        assert_eq!(written, 2);

        let file = PlotFile::read(&path).unwrap();
        assert_eq!(file.plots.len(), 2);
        assert_eq!(file.templates.len(), 1);
        assert_eq!(file.templates[0].name, "spectrum");
    }

    #[test]
    fn test_extract_load_adds_plots_and_templates() {
        let file = populated_store().to_plot_file(&PlotSelection::all());
        let mut store = PlotStore::new();

        let selection = PatternSelection::new(&["QA:Track.*"], &[] as &[&str]).unwrap();
        let report = store.extract_plots(&file, &selection, ExtractMode::Load);

        assert_eq!(report.added.len(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.has_template("spectrum"));
        assert!(!store.has_template("unused"));

        let again = store.extract_plots(&file, &selection, ExtractMode::Load);
        assert!(again.added.is_empty());
        assert_eq!(again.duplicates.len(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_extract_find_does_not_modify_store() {
        let file = populated_store().to_plot_file(&PlotSelection::all());
        let mut store = PlotStore::new();

        let selection = PatternSelection::new(&[] as &[&str], &["pt", "missing.*"]).unwrap();
        let report = store.extract_plots(&file, &selection, ExtractMode::Find);

        assert_eq!(report.found.len(), 2);
        assert_eq!(report.unmatched_patterns, vec!["missing.*".to_string()]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_template_is_reported() {
        let file = PlotFile {
            templates: Vec::new(),
            plots: vec![PlotDefinition::new("G", "C", "P").with_template("ghost")],
        };
        let mut store = PlotStore::new();
        let report = store.extract_plots(&file, &PatternSelection::default(), ExtractMode::Load);

        assert_eq!(report.missing_templates, vec!["ghost".to_string()]);
        assert_eq!(report.added.len(), 1);
    }

    #[test]
    fn test_file_cache_parses_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plots.json");
        populated_store().dump_plots(&path, &PlotSelection::all()).unwrap();

        let mut cache = PlotFileCache::new();
        assert_eq!(cache.load(&path).unwrap().plots.len(), 3);

        fs::remove_file(&path).unwrap();
        assert_eq!(cache.load(&path).unwrap().plots.len(), 3);

        cache.invalidate(&path);
        assert!(matches!(cache.load(&path), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"plots\": [{\"name\": 3}]}").unwrap();
        assert!(matches!(PlotFile::read(&path), Err(StoreError::Json { .. })));
    }
}
