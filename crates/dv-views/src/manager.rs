//! Plot manager facade
//!
//! Owns every piece of shared state (names, input table, ledger, plot
//! store, canvases, view history) and exposes the operations applications
//! and the command line use. Mode strings are only parsed here.

use std::path::{Path, PathBuf};

use dv_core::{
    ExtractMode, NameRegistry, OutputMode, PatternSelection, PlotDefinition, PlotId, PlotSelection,
    PlotTemplate, ViewHistory,
};
use dv_data::{DataReader, FileReader, InputSourceTable, Ledger, SourcePolicy};
use dv_render::{PlotPainter, SeriesPainter};
use dv_templates::{ExtractReport, PlotFileCache, PlotStore};
use tracing::{debug, info, warn};

use crate::dispatcher::{CreateReport, DispatchContext, Dispatcher};
use crate::display::{CanvasDisplay, NullDisplay};
use crate::export::OutputTarget;
use crate::OutputError;

/// Manager configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManagerSettings {
    pub output: OutputTarget,
    /// Policy applied by [`PlotManager::add_input_files`]
    pub source_policy: SourcePolicy,
}

impl ManagerSettings {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output: OutputTarget::new(output_directory),
            ..Default::default()
        }
    }
}

/// Facade over the whole plotting pipeline
pub struct PlotManager {
    settings: ManagerSettings,
    names: NameRegistry,
    inputs: InputSourceTable,
    ledger: Ledger,
    store: PlotStore,
    plot_files: PlotFileCache,
    dispatcher: Dispatcher,
    history: ViewHistory,
    reader: Box<dyn DataReader>,
    painter: Box<dyn PlotPainter>,
    display: Box<dyn CanvasDisplay>,
}

impl Default for PlotManager {
    fn default() -> Self {
        Self::new(
            Box::new(FileReader::new()),
            Box::new(SeriesPainter::new()),
            Box::new(NullDisplay),
        )
    }
}

impl PlotManager {
    /// Create a manager around its collaborators
    pub fn new(
        reader: Box<dyn DataReader>,
        painter: Box<dyn PlotPainter>,
        display: Box<dyn CanvasDisplay>,
    ) -> Self {
        Self {
            settings: ManagerSettings::default(),
            names: NameRegistry::new(),
            inputs: InputSourceTable::new(),
            ledger: Ledger::new(),
            store: PlotStore::new(),
            plot_files: PlotFileCache::new(),
            dispatcher: Dispatcher::new(),
            history: ViewHistory::new(),
            reader,
            painter,
            display,
        }
    }

    pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    // Settings

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn set_output_directory(&mut self, directory: impl Into<PathBuf>) {
        self.settings.output.directory = directory.into();
        info!("Output directory set to {}", self.settings.output.directory.display());
    }

    /// Append the figure group to output file names
    pub fn set_use_unique_plot_names(&mut self, unique: bool) {
        self.settings.output.use_unique_names = unique;
    }

    /// Name of the container file written in container mode
    pub fn set_output_file_name(&mut self, name: impl Into<String>) {
        self.settings.output.container_name = name.into();
    }

    pub fn set_source_policy(&mut self, policy: SourcePolicy) {
        self.settings.source_policy = policy;
    }

    // Input sources

    /// Register files for an input using the configured policy
    pub fn add_input_files<I, P>(&mut self, identifier: &str, paths: I) -> Result<(), OutputError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.add_input_files_with(identifier, paths, self.settings.source_policy)
    }

    pub fn add_input_file(&mut self, identifier: &str, path: impl Into<PathBuf>) -> Result<(), OutputError> {
        self.add_input_files_with(identifier, [path.into()], SourcePolicy::Append)
    }

    /// Register files for an input with an explicit policy
    ///
    /// When the path list of an input changes, everything loaded from it is
    /// forgotten so the next batch reads it again.
    pub fn add_input_files_with<I, P>(
        &mut self,
        identifier: &str,
        paths: I,
        policy: SourcePolicy,
    ) -> Result<(), OutputError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if self.inputs.add_source(identifier, paths, policy)? {
            self.evict_input(identifier);
        }
        Ok(())
    }

    /// Write the input table to a file
    pub fn dump_input_files(&self, path: &Path) -> Result<(), OutputError> {
        self.inputs.dump(path)?;
        Ok(())
    }

    /// Merge an input table file; returns the identifiers that changed
    pub fn load_input_files(&mut self, path: &Path) -> Result<Vec<String>, OutputError> {
        let changed = self.inputs.load(path, self.settings.source_policy)?;
        for identifier in &changed {
            self.evict_input(identifier);
        }
        Ok(changed)
    }

    pub fn inputs(&self) -> &InputSourceTable {
        &self.inputs
    }

    fn evict_input(&mut self, identifier: &str) {
        let Some(source) = self.names.lookup(identifier) else {
            return;
        };
        let datasets = self.ledger.evict_source(source);
        let canvases = self.dispatcher.invalidate_source(source);
        if datasets > 0 || canvases > 0 {
            info!(
                "Input '{}' changed: dropped {} dataset(s) and {} canvas(es)",
                identifier, datasets, canvases
            );
        }
    }

    /// Release every loaded dataset and rendered canvas
    pub fn clear_loaded_data(&mut self) {
        self.ledger.clear();
        self.dispatcher.invalidate_all();
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn names(&self) -> &NameRegistry {
        &self.names
    }

    // Plots and templates

    pub fn add_plot(&mut self, plot: PlotDefinition) -> Result<(), OutputError> {
        self.store.add_plot(plot)?;
        Ok(())
    }

    pub fn add_plot_template(&mut self, template: PlotTemplate) -> Result<(), OutputError> {
        self.store.add_template(template)?;
        Ok(())
    }

    pub fn store(&self) -> &PlotStore {
        &self.store
    }

    /// Dump the plots of a group (empty for all) restricted to `names`
    /// (empty for all); returns the number of plots written
    pub fn dump_plots(&mut self, path: &Path, figure_group: &str, names: &[String]) -> Result<usize, OutputError> {
        let selection = PlotSelection::from_parts(figure_group, "", names);
        let written = self.store.dump_plots(path, &selection)?;
        self.plot_files.invalidate(path);
        Ok(written)
    }

    pub fn dump_plot(&mut self, path: &Path, figure_group: &str, name: &str) -> Result<usize, OutputError> {
        self.dump_plots(path, figure_group, &[name.to_string()])
    }

    pub fn dump_all_plots(&mut self, path: &Path) -> Result<usize, OutputError> {
        self.dump_plots(path, "", &[])
    }

    /// Load or find plots in a plot file by group and name patterns
    pub fn extract_plots_from_file<G, N>(
        &mut self,
        path: &Path,
        groups: &[G],
        names: &[N],
        mode: ExtractMode,
    ) -> Result<ExtractReport, OutputError>
    where
        G: AsRef<str>,
        N: AsRef<str>,
    {
        let selection = PatternSelection::new(groups, names)?;
        let file = self.plot_files.load(path)?;
        Ok(self.store.extract_plots(file, &selection, mode))
    }

    /// [`Self::extract_plots_from_file`] with the mode given as text
    pub fn extract_plots_from_file_str<G, N>(
        &mut self,
        path: &Path,
        groups: &[G],
        names: &[N],
        mode: &str,
    ) -> Result<ExtractReport, OutputError>
    where
        G: AsRef<str>,
        N: AsRef<str>,
    {
        let mode: ExtractMode = mode.parse()?;
        self.extract_plots_from_file(path, groups, names, mode)
    }

    // Creation

    /// Create every selected plot
    pub fn create_plots(&mut self, selection: &PlotSelection, mode: OutputMode) -> Result<CreateReport, OutputError> {
        let mut ctx = DispatchContext {
            store: &self.store,
            names: &mut self.names,
            inputs: &self.inputs,
            ledger: &mut self.ledger,
            reader: self.reader.as_mut(),
            painter: self.painter.as_ref(),
            display: self.display.as_mut(),
            history: &mut self.history,
            target: &self.settings.output,
        };
        self.dispatcher.run(selection, mode, &mut ctx)
    }

    /// [`Self::create_plots`] with the mode given as text; empty group,
    /// category or names select everything
    pub fn create_plots_str(
        &mut self,
        figure_group: &str,
        figure_category: &str,
        names: &[String],
        mode: &str,
    ) -> Result<CreateReport, OutputError> {
        let mode: OutputMode = mode.parse()?;
        self.create_plots(&PlotSelection::from_parts(figure_group, figure_category, names), mode)
    }

    pub fn create_all_plots(&mut self, mode: OutputMode) -> Result<CreateReport, OutputError> {
        self.create_plots(&PlotSelection::all(), mode)
    }

    /// Create one plot; an empty category matches any
    pub fn create_plot(
        &mut self,
        name: &str,
        figure_group: &str,
        figure_category: &str,
        mode: OutputMode,
    ) -> Result<CreateReport, OutputError> {
        let Some(plot) = self.store.find_by_name(name, figure_group, figure_category) else {
            warn!("Plot '{}' in group '{}' is not booked", name, figure_group);
            return Ok(CreateReport::default());
        };
        let id = plot.id.clone();
        let selection = PlotSelection::from_parts(&id.figure_group, &id.figure_category, &[id.name.clone()]);
        self.create_plots(&selection, mode)
    }

    // Interactive navigation

    pub fn history(&self) -> &ViewHistory {
        &self.history
    }

    pub fn show_next(&mut self) -> Result<PlotId, OutputError> {
        let id = self.history.next().map_err(OutputError::Navigation)?.clone();
        self.redisplay(id)
    }

    pub fn show_previous(&mut self) -> Result<PlotId, OutputError> {
        let id = self.history.previous().map_err(OutputError::Navigation)?.clone();
        self.redisplay(id)
    }

    /// Jump to a position of the view history
    pub fn show_at(&mut self, position: usize) -> Result<PlotId, OutputError> {
        let id = self.history.seek(position).map_err(OutputError::Navigation)?.clone();
        self.redisplay(id)
    }

    fn redisplay(&mut self, id: PlotId) -> Result<PlotId, OutputError> {
        let canvas = self
            .dispatcher
            .canvas(&id)
            .ok_or_else(|| OutputError::Navigation(format!("Canvas of {} is no longer available", id)))?;
        let position = self.history.position().unwrap_or(0);
        debug!("Showing {} ({}/{})", id, position + 1, self.history.len());
        self.display.show(canvas, position, self.history.len())?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_core::DataRef;
    use dv_templates::StoreError;
    use std::fs;

    fn write_csv(dir: &Path, name: &str, rows: &[(i64, f64)]) -> PathBuf {
        let path = dir.join(format!("{}.csv", name));
        let mut content = String::from("x,y\n");
        for (x, y) in rows {
            content.push_str(&format!("{},{}\n", x, y));
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn manager(out: &Path) -> PlotManager {
        PlotManager::default().with_settings(ManagerSettings::new(out))
    }

    #[test]
    fn test_create_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "histX", &[(1, 1.0), (2, 3.0)]);
        let mut manager = manager(&dir.path().join("out"));

        manager.add_input_file("run1", csv).unwrap();
        manager
            .add_plot(PlotDefinition::new("G", "C", "P").with_data(DataRef::new("run1", "histX")))
            .unwrap();

        let report = manager.create_plots_str("", "", &[], "svg").unwrap();
        assert_eq!(report.created.len(), 1);
        assert!(dir.path().join("out/G/C/P.svg").exists());
        assert_eq!(manager.ledger().len(), 1);
    }

    #[test]
    fn test_changed_input_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_csv(dir.path(), "histX", &[(1, 1.0)]);
        let other_dir = dir.path().join("other");
        fs::create_dir_all(&other_dir).unwrap();
        let second = write_csv(&other_dir, "histX", &[(1, 2.0), (2, 4.0)]);

        let mut manager = manager(dir.path());
        manager.add_input_file("run1", &first).unwrap();
        manager
            .add_plot(PlotDefinition::new("G", "C", "P").with_data(DataRef::new("run1", "histX")))
            .unwrap();
        manager.create_all_plots(OutputMode::Interactive).unwrap();

        // same list again changes nothing
        manager.add_input_file("run1", &first).unwrap();
        let report = manager.create_all_plots(OutputMode::Interactive).unwrap();
        assert_eq!(report.load.reads, 0);

        manager
            .add_input_files_with("run1", [second], SourcePolicy::Replace)
            .unwrap();
        let report = manager.create_all_plots(OutputMode::Interactive).unwrap();
        assert_eq!(report.load.reads, 1);
        let run1 = manager.names().lookup("run1").unwrap();
        let histx = manager.names().lookup("histX").unwrap();
        let handle = manager
            .ledger()
            .get(&dv_data::LoadedDataKey::new(run1, histx))
            .unwrap();
        assert_eq!(handle.num_rows(), 2);
    }

    #[test]
    fn test_clear_loaded_data() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "histX", &[(1, 1.0)]);
        let mut manager = manager(dir.path());
        manager.add_input_file("run1", csv).unwrap();
        manager
            .add_plot(PlotDefinition::new("G", "C", "P").with_data(DataRef::new("run1", "histX")))
            .unwrap();
        manager.create_all_plots(OutputMode::Interactive).unwrap();

        manager.clear_loaded_data();
        assert!(manager.ledger().is_empty());
        let report = manager.create_all_plots(OutputMode::Interactive).unwrap();
        assert_eq!(report.load.reads, 1);
    }

    #[test]
    fn test_configuration_errors_leave_state_unchanged() {
        let mut manager = PlotManager::default();
        assert!(matches!(
            manager.add_input_files("", ["a.csv"]),
            Err(OutputError::Data(_))
        ));
        assert!(manager.inputs().is_empty());

        manager.add_plot(PlotDefinition::new("G", "C", "P")).unwrap();
        assert!(matches!(
            manager.add_plot(PlotDefinition::new("G", "C", "P")),
            Err(OutputError::Store(StoreError::DuplicatePlot(_)))
        ));
        assert_eq!(manager.store().len(), 1);

        assert!(matches!(
            manager.create_plots_str("", "", &[], "pdf"),
            Err(OutputError::Core(_))
        ));
        assert!(matches!(
            manager.extract_plots_from_file(Path::new("x.json"), &["("], &[] as &[&str], ExtractMode::Find),
            Err(OutputError::Core(_))
        ));
    }

    #[test]
    fn test_create_plot_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "histX", &[(1, 1.0), (2, 2.0)]);
        let mut manager = manager(dir.path());
        manager.set_use_unique_plot_names(true);
        manager.add_input_file("run1", csv).unwrap();
        for name in ["a", "b"] {
            manager
                .add_plot(PlotDefinition::new("G", "C", name).with_data(DataRef::new("run1", "histX")))
                .unwrap();
        }

        let report = manager.create_plot("b", "G", "", OutputMode::Macro).unwrap();
        assert_eq!(report.created.len(), 1);
        assert!(dir.path().join("G/C/b_IN_G.json").exists());
        assert!(!dir.path().join("G/C/a_IN_G.json").exists());

        let report = manager.create_plot("zzz", "G", "", OutputMode::Macro).unwrap();
        assert!(report.created.is_empty());
    }

    #[test]
    fn test_navigation() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "histX", &[(1, 1.0), (2, 2.0)]);
        let mut manager = manager(dir.path());
        manager.add_input_file("run1", csv).unwrap();
        for name in ["a", "b"] {
            manager
                .add_plot(PlotDefinition::new("G", "C", name).with_data(DataRef::new("run1", "histX")))
                .unwrap();
        }
        manager.create_all_plots(OutputMode::Interactive).unwrap();

        assert_eq!(manager.history().len(), 2);
        assert_eq!(manager.show_previous().unwrap(), PlotId::new("G", "C", "a"));
        assert_eq!(manager.show_next().unwrap(), PlotId::new("G", "C", "b"));
        assert!(matches!(manager.show_next(), Err(OutputError::Navigation(_))));

        manager.clear_loaded_data();
        assert!(matches!(manager.show_at(0), Err(OutputError::Navigation(_))));
    }

    #[test]
    fn test_dump_and_extract_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plots.json");
        let mut source = PlotManager::default();
        source
            .add_plot(PlotDefinition::new("QA", "Tracking", "pt").with_data(DataRef::new("run1", "histPt")))
            .unwrap();
        source.add_plot(PlotDefinition::new("Results", "", "pt")).unwrap();
        assert_eq!(source.dump_plot(&file, "QA", "pt").unwrap(), 1);

        let mut target = PlotManager::default();
        let found = target
            .extract_plots_from_file_str(&file, &["QA"], &["pt"], "find")
            .unwrap();
        assert_eq!(found.found.len(), 1);
        assert!(target.store().is_empty());

        let loaded = target
            .extract_plots_from_file(&file, &[] as &[&str], &[] as &[&str], ExtractMode::Load)
            .unwrap();
        assert_eq!(loaded.added, vec![PlotId::new("QA", "Tracking", "pt")]);
    }

    #[test]
    fn test_dump_refreshes_parsed_plot_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plots.json");
        let mut manager = PlotManager::default();
        manager.add_plot(PlotDefinition::new("G", "C", "a")).unwrap();
        manager.dump_all_plots(&file).unwrap();

        let none: &[&str] = &[];
        let first = manager.extract_plots_from_file(&file, none, none, ExtractMode::Find).unwrap();
        assert_eq!(first.found.len(), 1);

        manager.add_plot(PlotDefinition::new("G", "C", "b")).unwrap();
        assert_eq!(manager.dump_all_plots(&file).unwrap(), 2);

        let second = manager.extract_plots_from_file(&file, none, none, ExtractMode::Find).unwrap();
        assert_eq!(second.found.len(), 2);
    }

    #[test]
    fn test_appended_fallback_file_resolves_missing_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_csv(dir.path(), "histX", &[(1, 1.0)]);
        let fallback = write_csv(dir.path(), "histY", &[(1, 2.0), (2, 3.0)]);

        let mut manager = manager(dir.path());
        manager.add_input_file("run1", &first).unwrap();
        manager
            .add_plot(PlotDefinition::new("G", "C", "P").with_data(DataRef::new("run1", "histY")))
            .unwrap();

        let report = manager.create_all_plots(OutputMode::Interactive).unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.load.missing, vec![("run1".to_string(), "histY".to_string())]);

        // cached as missing until the file list of run1 changes
        let report = manager.create_all_plots(OutputMode::Interactive).unwrap();
        assert_eq!(report.load.reads, 0);

        manager.add_input_file("run1", &fallback).unwrap();
        let report = manager.create_all_plots(OutputMode::Interactive).unwrap();
        assert_eq!(report.load.reads, 1);
        assert_eq!(report.created.len(), 1);
        assert_eq!(manager.inputs().paths("run1").unwrap(), &[first, fallback]);
    }
}
