//! Rendering abstraction layer
//!
//! Painters turn a resolved plot plus its borrowed datasets into a
//! [`Canvas`]; the canvas knows how to export itself as SVG, PNG or a
//! replayable macro.

mod canvas;
mod painter;

pub use canvas::{Canvas, Series};
pub use painter::{PlotPainter, SeriesPainter};

use arrow::error::ArrowError;
use dv_core::PlotId;
use thiserror::Error;

/// Errors raised while producing or exporting a canvas
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Plot '{plot}' cannot be drawn: {reason}")]
    NotPlottable { plot: PlotId, reason: String },

    #[error("Plot '{0}' has no drawable points")]
    EmptyData(PlotId),

    #[error("Drawing backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Macro error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}
