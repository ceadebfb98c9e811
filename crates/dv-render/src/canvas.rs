//! Rendered canvas and its export formats

use std::ops::Range;
use std::path::Path;

use dv_core::{DrawStyle, PlotId, ResolvedPlot};
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Series colors, cycled
const SERIES_COLORS: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(214, 39, 40),
    RGBColor(44, 160, 44),
    RGBColor(255, 127, 14),
    RGBColor(148, 103, 189),
    RGBColor(23, 190, 207),
];

const MACRO_FORMAT: &str = "datavis-macro";
const MACRO_VERSION: u32 = 1;

/// One drawn series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

/// Everything needed to draw one plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub id: PlotId,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
    pub log_x: bool,
    pub log_y: bool,
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub draw_style: DrawStyle,
    pub legend: bool,
    pub series: Vec<Series>,
}

#[derive(Serialize, Deserialize)]
struct MacroDocument {
    format: String,
    version: u32,
    canvas: Canvas,
}

fn backend_error<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

fn axis_value(value: f64, log: bool) -> Option<f64> {
    if !log {
        return value.is_finite().then_some(value);
    }
    (value > 0.0 && value.is_finite()).then(|| value.log10())
}

/// Inclusive at both ends
fn within(range: &Range<f64>, value: f64) -> bool {
    value >= range.start && value <= range.end
}

fn clip(points: Vec<(f64, f64)>, x_range: &Range<f64>, y_range: &Range<f64>) -> Vec<(f64, f64)> {
    points
        .into_iter()
        .filter(|&(x, y)| within(x_range, x) && within(y_range, y))
        .collect()
}

fn padded(min: f64, max: f64) -> Range<f64> {
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if (max - min).abs() < f64::EPSILON {
        return (min - 0.5)..(max + 0.5);
    }
    let pad = (max - min) * 0.05;
    (min - pad)..(max + pad)
}

impl Canvas {
    /// Empty canvas carrying the presentation of a resolved plot
    pub fn for_plot(plot: &ResolvedPlot) -> Self {
        Self {
            id: plot.id.clone(),
            title: plot.title.clone(),
            x_label: plot.x_label.clone(),
            y_label: plot.y_label.clone(),
            width: plot.width,
            height: plot.height,
            log_x: plot.log_x,
            log_y: plot.log_y,
            x_range: plot.x_range,
            y_range: plot.y_range,
            draw_style: plot.draw_style,
            legend: plot.legend,
            series: Vec::new(),
        }
    }

    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    /// Series points mapped onto the (possibly logarithmic) axes
    ///
    /// Points that cannot be shown on a log axis are dropped.
    fn axis_points(&self, series: &Series) -> Vec<(f64, f64)> {
        series
            .points
            .iter()
            .filter_map(|(x, y)| Some((axis_value(*x, self.log_x)?, axis_value(*y, self.log_y)?)))
            .collect()
    }

    fn axis_range(&self, explicit: Option<(f64, f64)>, log: bool, values: impl Iterator<Item = f64>) -> Range<f64> {
        if let Some((lo, hi)) = explicit {
            if let (Some(lo), Some(hi)) = (axis_value(lo, log), axis_value(hi, log)) {
                if lo < hi {
                    return lo..hi;
                }
            }
        }
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(v), max.max(v))
        });
        padded(min, max)
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<(), RenderError> {
        root.fill(&WHITE).map_err(backend_error)?;

        let mapped: Vec<Vec<(f64, f64)>> = self.series.iter().map(|s| self.axis_points(s)).collect();
        let x_range = self.axis_range(self.x_range, self.log_x, mapped.iter().flatten().map(|p| p.0));
        let y_range = self.axis_range(self.y_range, self.log_y, mapped.iter().flatten().map(|p| p.1));

        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .build_cartesian_2d(x_range.clone(), y_range.clone())
            .map_err(backend_error)?;

        chart
            .plotting_area()
            .draw(&Rectangle::new(
                [(x_range.start, y_range.start), (x_range.end, y_range.end)],
                BLACK.stroke_width(1),
            ))
            .map_err(backend_error)?;

        for (idx, points) in mapped.into_iter().enumerate() {
            let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
            let visible = clip(points, &x_range, &y_range);

            match self.draw_style {
                DrawStyle::Line => {
                    chart
                        .draw_series(std::iter::once(PathElement::new(visible, color.stroke_width(2))))
                        .map_err(backend_error)?;
                }
                DrawStyle::Points => {
                    chart
                        .draw_series(visible.into_iter().map(|p| Circle::new(p, 3, color.filled())))
                        .map_err(backend_error)?;
                }
            }
        }

        root.present().map_err(backend_error)?;
        Ok(())
    }

    /// Render as an SVG document
    pub fn to_svg(&self) -> Result<String, RenderError> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            self.draw(&root)?;
        }
        Ok(svg)
    }

    /// Render into a PNG file
    pub fn write_png(&self, path: &Path) -> Result<(), RenderError> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        self.draw(&root)
    }

    /// Serialize as a replayable macro
    pub fn to_macro(&self) -> Result<String, RenderError> {
        let document = MacroDocument {
            format: MACRO_FORMAT.to_string(),
            version: MACRO_VERSION,
            canvas: self.clone(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Restore a canvas from a macro produced by [`Canvas::to_macro`]
    pub fn from_macro(content: &str) -> Result<Self, RenderError> {
        let document: MacroDocument = serde_json::from_str(content)?;
        if document.format != MACRO_FORMAT || document.version != MACRO_VERSION {
            return Err(RenderError::Backend(format!(
                "unsupported macro format {} v{}",
                document.format, document.version
            )));
        }
        Ok(document.canvas)
    }
}
