//! Output dispatcher
//!
//! One `run` drives a batch of plots through
//! `Selecting -> Resolving -> Rendering -> Routing -> Done`. Every stage
//! works on the whole batch so that data loading happens in one batched
//! read per input source. A plot that fails at any stage is recorded as
//! skipped; the rest of the batch carries on.

use std::fmt;
use std::mem;
use std::path::PathBuf;

use ahash::AHashMap;
use dv_core::{
    NameId, NameRegistry, OutputMode, PlotDefinition, PlotId, PlotSelection, ResolvedPlot, ViewHistory,
};
use dv_data::{DataHandle, DataReader, InputSourceTable, Ledger, LoadPlanner, LoadReport, LoadedDataKey};
use dv_render::{Canvas, PlotPainter};
use dv_templates::{PlotStore, StoreError};
use tracing::{debug, info, warn};

use crate::container::ContainerWriter;
use crate::display::CanvasDisplay;
use crate::export::OutputTarget;
use crate::OutputError;

/// Stage of a dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Selecting,
    Resolving,
    Rendering,
    Routing,
    Done,
}

/// Why a plot produced no output
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    UnknownTemplate(String),
    /// (input, dataset) pairs that could not be loaded
    DataUnavailable(Vec<(String, String)>),
    NotPlottable,
    RenderFailed(String),
    OutputFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownTemplate(name) => write!(f, "template '{}' does not exist", name),
            SkipReason::DataUnavailable(pairs) => {
                let names: Vec<String> = pairs.iter().map(|(i, d)| format!("{}:{}", i, d)).collect();
                write!(f, "data unavailable ({})", names.join(", "))
            }
            SkipReason::NotPlottable => write!(f, "painter cannot draw the plot from its data"),
            SkipReason::RenderFailed(e) => write!(f, "rendering failed: {}", e),
            SkipReason::OutputFailed(e) => write!(f, "output failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedPlot {
    pub id: PlotId,
    /// File written for the plot; `None` for interactive output
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPlot {
    pub id: PlotId,
    pub reason: SkipReason,
}

/// Outcome of one batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateReport {
    pub created: Vec<CreatedPlot>,
    pub skipped: Vec<SkippedPlot>,
    pub load: LoadReport,
}

impl CreateReport {
    pub fn is_created(&self, id: &PlotId) -> bool {
        self.created.iter().any(|c| &c.id == id)
    }

    pub fn skip_reason(&self, id: &PlotId) -> Option<&SkipReason> {
        self.skipped.iter().find(|s| &s.id == id).map(|s| &s.reason)
    }

    fn skip(&mut self, id: PlotId, reason: SkipReason) {
        warn!("Skipping plot {}: {}", id, reason);
        self.skipped.push(SkippedPlot { id, reason });
    }
}

struct CanvasEntry {
    canvas: Canvas,
    depends_on: Vec<LoadedDataKey>,
}

/// Rendered canvases kept across batches, with the datasets they were
/// drawn from
#[derive(Default)]
pub struct CanvasLedger {
    entries: AHashMap<PlotId, CanvasEntry>,
}

impl CanvasLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PlotId) -> Option<&Canvas> {
        self.entries.get(id).map(|e| &e.canvas)
    }

    pub fn contains(&self, id: &PlotId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, canvas: Canvas, depends_on: Vec<LoadedDataKey>) {
        self.entries.insert(canvas.id.clone(), CanvasEntry { canvas, depends_on });
    }

    /// Drop every canvas drawn from a dataset of `source`
    pub fn invalidate_source(&mut self, source: NameId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.depends_on.iter().all(|key| key.source != source));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a run borrows from its owner
pub struct DispatchContext<'a> {
    pub store: &'a PlotStore,
    pub names: &'a mut NameRegistry,
    pub inputs: &'a InputSourceTable,
    pub ledger: &'a mut Ledger,
    pub reader: &'a mut dyn DataReader,
    pub painter: &'a dyn PlotPainter,
    pub display: &'a mut dyn CanvasDisplay,
    pub history: &'a mut ViewHistory,
    pub target: &'a OutputTarget,
}

struct ReadyPlot {
    plot: ResolvedPlot,
    keys: Vec<LoadedDataKey>,
}

/// Batch state machine plus the canvases it produced
#[derive(Default)]
pub struct Dispatcher {
    canvases: CanvasLedger,
    transitions: Vec<DispatchState>,
    renders: usize,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every plot of the store matching `selection`
    ///
    /// Only a broken name registry aborts the batch; all per-plot problems
    /// end up in the report.
    pub fn run(
        &mut self,
        selection: &PlotSelection,
        mode: OutputMode,
        ctx: &mut DispatchContext<'_>,
    ) -> Result<CreateReport, OutputError> {
        self.transitions.clear();
        let store = ctx.store;
        let mut report = CreateReport::default();
        let mut selected: Vec<&PlotDefinition> = Vec::new();
        let mut ready: Vec<ReadyPlot> = Vec::new();
        let mut rendered: Vec<PlotId> = Vec::new();

        let mut state = DispatchState::Selecting;
        loop {
            self.transitions.push(state);
            state = match state {
                DispatchState::Selecting => {
                    selected = store.select(selection);
                    info!("Selected {} plot(s) for {} output", selected.len(), mode);
                    DispatchState::Resolving
                }
                DispatchState::Resolving => {
                    ready = Self::resolve(&selected, ctx, &mut report)?;
                    DispatchState::Rendering
                }
                DispatchState::Rendering => {
                    rendered = self.render(mem::take(&mut ready), ctx, &mut report);
                    DispatchState::Routing
                }
                DispatchState::Routing => {
                    self.route(&rendered, mode, ctx, &mut report);
                    DispatchState::Done
                }
                DispatchState::Done => break,
            };
        }

        info!(
            "Created {} plot(s), skipped {}",
            report.created.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn resolve(
        selected: &[&PlotDefinition],
        ctx: &mut DispatchContext<'_>,
        report: &mut CreateReport,
    ) -> Result<Vec<ReadyPlot>, OutputError> {
        let mut resolved = Vec::with_capacity(selected.len());
        for plot in selected {
            match ctx.store.resolve(plot) {
                Ok(r) => resolved.push(r),
                Err(StoreError::UnknownTemplate { template, .. }) => {
                    report.skip(plot.id.clone(), SkipReason::UnknownTemplate(template))
                }
                Err(e) => return Err(e.into()),
            }
        }

        let required = LoadPlanner::plan(&resolved, &mut *ctx.names);
        debug!(
            "Batch needs {} dataset(s) from {} input(s)",
            LoadPlanner::pair_count(&required),
            required.len()
        );
        let load = ctx
            .ledger
            .ensure_loaded(&required, &*ctx.names, ctx.inputs, &mut *ctx.reader)?;
        report.load.merge(load);

        let mut ready = Vec::with_capacity(resolved.len());
        for plot in resolved {
            let keys: Vec<LoadedDataKey> = plot
                .data
                .iter()
                .map(|d| LoadPlanner::key_for(d, &mut *ctx.names))
                .collect();
            let unavailable: Vec<(String, String)> = plot
                .data
                .iter()
                .zip(&keys)
                .filter(|(_, key)| ctx.ledger.get(key).is_none())
                .map(|(d, _)| (d.input.clone(), d.dataset.clone()))
                .collect();

            if unavailable.is_empty() {
                ready.push(ReadyPlot { plot, keys });
            } else {
                report.skip(plot.id, SkipReason::DataUnavailable(unavailable));
            }
        }
        Ok(ready)
    }

    fn render(&mut self, ready: Vec<ReadyPlot>, ctx: &DispatchContext<'_>, report: &mut CreateReport) -> Vec<PlotId> {
        let mut rendered = Vec::with_capacity(ready.len());
        for ReadyPlot { plot, keys } in ready {
            if self.canvases.contains(&plot.id) {
                debug!("Reusing canvas of {}", plot.id);
                rendered.push(plot.id);
                continue;
            }

            let handles: Vec<&DataHandle> = keys.iter().filter_map(|k| ctx.ledger.get(k)).collect();
            if !ctx.painter.can_plot(&plot, &handles) {
                report.skip(plot.id, SkipReason::NotPlottable);
                continue;
            }
            match ctx.painter.render(&plot, &handles) {
                Ok(canvas) => {
                    self.renders += 1;
                    self.canvases.insert(canvas, keys);
                    rendered.push(plot.id);
                }
                Err(e) => report.skip(plot.id, SkipReason::RenderFailed(e.to_string())),
            }
        }
        rendered
    }

    fn route(&self, rendered: &[PlotId], mode: OutputMode, ctx: &mut DispatchContext<'_>, report: &mut CreateReport) {
        let canvases = rendered.iter().filter_map(|id| self.canvases.get(id));

        match mode {
            OutputMode::Interactive => {
                for canvas in canvases {
                    ctx.history.push(canvas.id.clone());
                    let position = ctx.history.position().unwrap_or(0);
                    match ctx.display.show(canvas, position, ctx.history.len()) {
                        Ok(()) => report.created.push(CreatedPlot {
                            id: canvas.id.clone(),
                            output: None,
                        }),
                        Err(e) => report.skip(canvas.id.clone(), SkipReason::OutputFailed(e.to_string())),
                    }
                }
            }
            OutputMode::File(_) | OutputMode::Macro => {
                for canvas in canvases {
                    let written = match mode {
                        OutputMode::File(format) => ctx.target.write_image(canvas, format),
                        _ => ctx.target.write_macro(canvas),
                    };
                    match written {
                        Ok(path) => report.created.push(CreatedPlot {
                            id: canvas.id.clone(),
                            output: Some(path),
                        }),
                        Err(e) => report.skip(canvas.id.clone(), SkipReason::OutputFailed(e.to_string())),
                    }
                }
            }
            OutputMode::Container => {
                if rendered.is_empty() {
                    return;
                }
                let path = ctx.target.container_path();
                let mut writer = match ContainerWriter::open(&path) {
                    Ok(writer) => writer,
                    Err(e) => {
                        for id in rendered {
                            report.skip(id.clone(), SkipReason::OutputFailed(e.to_string()));
                        }
                        return;
                    }
                };
                for canvas in canvases {
                    match writer.write(&ctx.target.container_key(&canvas.id), canvas) {
                        Ok(()) => report.created.push(CreatedPlot {
                            id: canvas.id.clone(),
                            output: Some(path.clone()),
                        }),
                        Err(e) => report.skip(canvas.id.clone(), SkipReason::OutputFailed(e.to_string())),
                    }
                }
                if let Err(e) = writer.finish() {
                    warn!("Closing container {} failed: {}", path.display(), e);
                }
            }
        }
    }

    /// Canvas of a plot created earlier
    pub fn canvas(&self, id: &PlotId) -> Option<&Canvas> {
        self.canvases.get(id)
    }

    pub fn canvases(&self) -> &CanvasLedger {
        &self.canvases
    }

    /// Drop canvases drawn from `source`; returns how many were dropped
    pub fn invalidate_source(&mut self, source: NameId) -> usize {
        let dropped = self.canvases.invalidate_source(source);
        if dropped > 0 {
            debug!("Dropped {} canvas(es) depending on {}", dropped, source);
        }
        dropped
    }

    pub fn invalidate_all(&mut self) {
        self.canvases.clear();
    }

    /// States visited by the last run
    pub fn transitions(&self) -> &[DispatchState] {
        &self.transitions
    }

    /// Number of painter renders since creation
    pub fn renders(&self) -> usize {
        self.renders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use dv_core::{DataRef, PlotTemplate};
    use dv_data::{ReadOutcome, SourcePolicy};
    use dv_render::SeriesPainter;
    use std::sync::Arc;

    /// Reader serving a fixed set of dataset names from any file
    struct MapReader {
        available: Vec<String>,
        requests: Vec<Vec<String>>,
    }

    impl MapReader {
        fn new(available: &[&str]) -> Self {
            Self {
                available: available.iter().map(|s| s.to_string()).collect(),
                requests: Vec::new(),
            }
        }
    }

    impl DataReader for MapReader {
        fn read(&mut self, paths: &[PathBuf], names: &[String]) -> ReadOutcome {
            self.requests.push(names.to_vec());
            let mut outcome = ReadOutcome::default();
            for name in names.iter().filter(|n| self.available.contains(n)) {
                let schema = Arc::new(Schema::new(vec![
                    Field::new("x", DataType::Int64, false),
                    Field::new("y", DataType::Float64, false),
                ]));
                let batch = RecordBatch::try_new(
                    schema,
                    vec![
                        Arc::new(Int64Array::from(vec![1, 2, 3])),
                        Arc::new(Float64Array::from(vec![2.0, 4.0, 8.0])),
                    ],
                )
                .unwrap();
                outcome
                    .found
                    .insert(name.clone(), DataHandle::new(name.as_str(), paths[0].clone(), batch));
            }
            outcome
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        shown: Vec<(PlotId, usize, usize)>,
    }

    impl CanvasDisplay for RecordingDisplay {
        fn show(&mut self, canvas: &Canvas, position: usize, total: usize) -> Result<(), OutputError> {
            self.shown.push((canvas.id.clone(), position, total));
            Ok(())
        }
    }

    struct Fixture {
        store: PlotStore,
        names: NameRegistry,
        inputs: InputSourceTable,
        ledger: Ledger,
        reader: MapReader,
        display: RecordingDisplay,
        history: ViewHistory,
        target: OutputTarget,
    }

    impl Fixture {
        fn new(available: &[&str]) -> Self {
            let mut inputs = InputSourceTable::new();
            inputs
                .add_source("run1", ["fileA.db"], SourcePolicy::Append)
                .unwrap();
            Self {
                store: PlotStore::new(),
                names: NameRegistry::new(),
                inputs,
                ledger: Ledger::new(),
                reader: MapReader::new(available),
                display: RecordingDisplay::default(),
                history: ViewHistory::new(),
                target: OutputTarget::new("unused"),
            }
        }

        fn run(&mut self, dispatcher: &mut Dispatcher, mode: OutputMode) -> CreateReport {
            let painter = SeriesPainter::new();
            let mut ctx = DispatchContext {
                store: &self.store,
                names: &mut self.names,
                inputs: &self.inputs,
                ledger: &mut self.ledger,
                reader: &mut self.reader,
                painter: &painter,
                display: &mut self.display,
                history: &mut self.history,
                target: &self.target,
            };
            dispatcher.run(&PlotSelection::all(), mode, &mut ctx).unwrap()
        }
    }

    fn plot(name: &str, dataset: &str) -> PlotDefinition {
        PlotDefinition::new("G", "C", name).with_data(DataRef::new("run1", dataset))
    }

    #[test]
    fn test_states_in_order() {
        let mut fixture = Fixture::new(&["histX"]);
        fixture.store.add_plot(plot("P", "histX")).unwrap();
        let mut dispatcher = Dispatcher::new();

        fixture.run(&mut dispatcher, OutputMode::Interactive);
        assert_eq!(
            dispatcher.transitions(),
            &[
                DispatchState::Selecting,
                DispatchState::Resolving,
                DispatchState::Rendering,
                DispatchState::Routing,
                DispatchState::Done,
            ]
        );
    }

    #[test]
    fn test_failures_skip_single_plots() {
        let mut fixture = Fixture::new(&["histX"]);
        fixture.store.add_plot(plot("good", "histX")).unwrap();
        fixture.store.add_plot(plot("missing", "histNope")).unwrap();
        fixture
            .store
            .add_plot(plot("orphan", "histX").with_template("ghost"))
            .unwrap();
        fixture.store.add_plot(PlotDefinition::new("G", "C", "empty")).unwrap();
        let mut dispatcher = Dispatcher::new();

        let report = fixture.run(&mut dispatcher, OutputMode::Interactive);

        assert_eq!(report.created.len(), 1);
        assert!(report.is_created(&PlotId::new("G", "C", "good")));
        assert_eq!(
            report.skip_reason(&PlotId::new("G", "C", "missing")),
            Some(&SkipReason::DataUnavailable(vec![(
                "run1".to_string(),
                "histNope".to_string()
            )]))
        );
        assert_eq!(
            report.skip_reason(&PlotId::new("G", "C", "orphan")),
            Some(&SkipReason::UnknownTemplate("ghost".to_string()))
        );
        assert_eq!(
            report.skip_reason(&PlotId::new("G", "C", "empty")),
            Some(&SkipReason::NotPlottable)
        );
        assert_eq!(report.load.missing.len(), 1);
    }

    #[test]
    fn test_one_read_per_source_and_canvas_reuse() {
        let mut fixture = Fixture::new(&["histX", "histY"]);
        fixture.store.add_plot(plot("a", "histX")).unwrap();
        fixture.store.add_plot(plot("b", "histX")).unwrap();
        fixture.store.add_plot(plot("c", "histY")).unwrap();
        let mut dispatcher = Dispatcher::new();

        let first = fixture.run(&mut dispatcher, OutputMode::Interactive);
        assert_eq!(first.created.len(), 3);
        assert_eq!(fixture.reader.requests.len(), 1);
        assert_eq!(fixture.reader.requests[0].len(), 2);
        assert_eq!(dispatcher.renders(), 3);

        let second = fixture.run(&mut dispatcher, OutputMode::Interactive);
        assert_eq!(second.created.len(), 3);
        assert_eq!(second.load.reads, 0);
        assert_eq!(fixture.reader.requests.len(), 1);
        assert_eq!(dispatcher.renders(), 3);
    }

    #[test]
    fn test_invalidate_source_forces_rerender() {
        let mut fixture = Fixture::new(&["histX"]);
        fixture.store.add_plot(plot("a", "histX")).unwrap();
        let mut dispatcher = Dispatcher::new();
        fixture.run(&mut dispatcher, OutputMode::Interactive);

        let run1 = fixture.names.lookup("run1").unwrap();
        assert_eq!(dispatcher.invalidate_source(run1), 1);
        fixture.ledger.evict_source(run1);

        fixture.run(&mut dispatcher, OutputMode::Interactive);
        assert_eq!(fixture.reader.requests.len(), 2);
        assert_eq!(dispatcher.renders(), 2);
    }

    #[test]
    fn test_interactive_records_history() {
        let mut fixture = Fixture::new(&["histX"]);
        fixture.store.add_plot(plot("a", "histX")).unwrap();
        fixture.store.add_plot(plot("b", "histX")).unwrap();
        let mut dispatcher = Dispatcher::new();

        fixture.run(&mut dispatcher, OutputMode::Interactive);

        assert_eq!(fixture.history.len(), 2);
        assert_eq!(fixture.display.shown.len(), 2);
        assert_eq!(fixture.display.shown[1], (PlotId::new("G", "C", "b"), 1, 2));
    }

    #[test]
    fn test_template_data_is_loaded() {
        let mut fixture = Fixture::new(&["histT"]);
        fixture
            .store
            .add_template(PlotTemplate::new("t").with_data(DataRef::new("run1", "histT")))
            .unwrap();
        fixture
            .store
            .add_plot(PlotDefinition::new("G", "C", "from_template").with_template("t"))
            .unwrap();
        let mut dispatcher = Dispatcher::new();

        let report = fixture.run(&mut dispatcher, OutputMode::Interactive);
        assert_eq!(report.created.len(), 1);
        assert_eq!(fixture.reader.requests, vec![vec!["histT".to_string()]]);
    }

    #[test]
    fn test_file_and_container_routing() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new(&["histX"]);
        fixture.target = OutputTarget::new(dir.path());
        fixture.store.add_plot(plot("P", "histX")).unwrap();
        let mut dispatcher = Dispatcher::new();

        let report = fixture.run(&mut dispatcher, OutputMode::Macro);
        let expected = dir.path().join("G").join("C").join("P.json");
        assert_eq!(report.created[0].output.as_deref(), Some(expected.as_path()));
        assert!(expected.exists());

        let report = fixture.run(&mut dispatcher, OutputMode::Container);
        let container = dir.path().join("ResultPlots.db");
        assert_eq!(report.created[0].output.as_deref(), Some(container.as_path()));
        assert_eq!(ContainerWriter::stored_keys(&container).unwrap(), vec!["G/C/P"]);
    }
}
