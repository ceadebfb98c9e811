//! Plot store and template system
//!
//! This crate owns the concrete plot definitions and the reusable templates
//! they may reference, resolves a definition against its template for one
//! render pass, and reads and writes plot definition files.

pub mod file;
pub mod store;

use std::path::PathBuf;

use dv_core::{CoreError, PlotId};
use thiserror::Error;

pub use file::{ExtractReport, PlotFile, PlotFileCache};
pub use store::PlotStore;

/// Errors raised by the plot store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Plot '{0}' is already booked")]
    DuplicatePlot(PlotId),

    #[error("Template '{0}' is already defined")]
    DuplicateTemplate(String),

    #[error("Template '{template}' referenced by plot '{plot}' does not exist")]
    UnknownTemplate { plot: PlotId, template: String },

    #[error("Template name must not be empty")]
    EmptyTemplateName,

    #[error("Plot file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed plot file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}
