//! Plot painters

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use dv_core::{DataRef, ResolvedPlot};
use dv_data::DataHandle;
use tracing::debug;

use crate::canvas::{Canvas, Series};
use crate::RenderError;

/// Painter collaborator used by the output dispatcher
///
/// Datasets are passed in the order of `plot.data` and are borrowed from
/// the ledger.
pub trait PlotPainter {
    /// Cheap check whether `render` can succeed for this plot and data
    fn can_plot(&self, plot: &ResolvedPlot, data: &[&DataHandle]) -> bool;

    /// Draw the plot
    fn render(&self, plot: &ResolvedPlot, data: &[&DataHandle]) -> Result<Canvas, RenderError>;
}

/// Default painter: one series per data reference
///
/// Columns are taken by name when the reference names them, otherwise the
/// first two numeric columns are used; a single numeric column is drawn
/// against the row index.
#[derive(Debug, Clone, Default)]
pub struct SeriesPainter;

enum Columns<'a> {
    Pair(&'a ArrayRef, &'a ArrayRef),
    Single(&'a ArrayRef),
}

fn is_numeric(array: &ArrayRef) -> bool {
    array.data_type().is_numeric()
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a ArrayRef> {
    batch.column_by_name(name).filter(|c| is_numeric(c))
}

impl SeriesPainter {
    pub fn new() -> Self {
        Self
    }

    fn columns<'a>(data: &DataRef, batch: &'a RecordBatch) -> Option<Columns<'a>> {
        match (&data.x_column, &data.y_column) {
            (Some(x), Some(y)) => Some(Columns::Pair(column(batch, x)?, column(batch, y)?)),
            (None, Some(y)) => Some(Columns::Single(column(batch, y)?)),
            (Some(x), None) => {
                let x_col = column(batch, x)?;
                let y_col = batch
                    .schema()
                    .fields()
                    .iter()
                    .zip(batch.columns())
                    .find(|(f, c)| f.name() != x && is_numeric(c))
                    .map(|(_, c)| c)?;
                Some(Columns::Pair(x_col, y_col))
            }
            (None, None) => {
                let mut numeric = batch.columns().iter().filter(|c| is_numeric(c));
                match (numeric.next(), numeric.next()) {
                    (Some(x), Some(y)) => Some(Columns::Pair(x, y)),
                    (Some(y), None) => Some(Columns::Single(y)),
                    _ => None,
                }
            }
        }
    }

    fn as_f64(array: &ArrayRef) -> Result<Float64Array, RenderError> {
        let casted = cast(array, &DataType::Float64)?;
        Ok(casted
            .as_any()
            .downcast_ref::<Float64Array>()
            .cloned()
            .unwrap_or_else(|| Float64Array::from(Vec::<f64>::new())))
    }

    fn points(columns: Columns<'_>) -> Result<Vec<(f64, f64)>, RenderError> {
        let points = match columns {
            Columns::Pair(x, y) => {
                let (x, y) = (Self::as_f64(x)?, Self::as_f64(y)?);
                (0..x.len())
                    .filter(|i| x.is_valid(*i) && y.is_valid(*i))
                    .map(|i| (x.value(i), y.value(i)))
                    .collect()
            }
            Columns::Single(y) => {
                let y = Self::as_f64(y)?;
                (0..y.len())
                    .filter(|i| y.is_valid(*i))
                    .map(|i| (i as f64, y.value(i)))
                    .collect()
            }
        };
        Ok(points)
    }
}

impl PlotPainter for SeriesPainter {
    fn can_plot(&self, plot: &ResolvedPlot, data: &[&DataHandle]) -> bool {
        !data.is_empty()
            && data.len() == plot.data.len()
            && plot
                .data
                .iter()
                .zip(data)
                .all(|(r, h)| h.num_rows() > 0 && Self::columns(r, &h.batch).is_some())
    }

    fn render(&self, plot: &ResolvedPlot, data: &[&DataHandle]) -> Result<Canvas, RenderError> {
        if !self.can_plot(plot, data) {
            return Err(RenderError::NotPlottable {
                plot: plot.id.clone(),
                reason: "datasets lack numeric columns or rows".to_string(),
            });
        }

        let mut canvas = Canvas::for_plot(plot);
        for (data_ref, handle) in plot.data.iter().zip(data) {
            let columns = Self::columns(data_ref, &handle.batch).ok_or_else(|| RenderError::NotPlottable {
                plot: plot.id.clone(),
                reason: format!("no numeric columns in '{}'", handle.name),
            })?;
            canvas.series.push(Series {
                label: data_ref.display_label(),
                points: Self::points(columns)?,
            });
        }

        if canvas.point_count() == 0 {
            return Err(RenderError::EmptyData(plot.id.clone()));
        }
        debug!("Rendered {} with {} series", plot.id, canvas.series.len());
        Ok(canvas)
    }
}
