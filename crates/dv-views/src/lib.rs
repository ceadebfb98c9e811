//! Output side of the plotting framework
//!
//! The dispatcher drives one batch of plots through selection, resolution,
//! rendering and routing; the manager is the facade applications talk to.

pub mod container;
pub mod dispatcher;
pub mod display;
pub mod export;
pub mod manager;

use std::path::PathBuf;

use thiserror::Error;

pub use container::ContainerWriter;
pub use dispatcher::{
    CanvasLedger, CreateReport, CreatedPlot, DispatchContext, DispatchState, Dispatcher, SkipReason,
    SkippedPlot,
};
pub use display::{CanvasDisplay, NullDisplay};
pub use export::OutputTarget;
pub use manager::{ManagerSettings, PlotManager};

/// Errors surfaced by the output layer
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Container file error: {0}")]
    Container(String),

    #[error(transparent)]
    Render(#[from] dv_render::RenderError),

    #[error(transparent)]
    Data(#[from] dv_data::DataError),

    #[error(transparent)]
    Store(#[from] dv_templates::StoreError),

    #[error(transparent)]
    Core(#[from] dv_core::CoreError),

    #[error("Output directory {} is not usable", .0.display())]
    InvalidDirectory(PathBuf),

    #[error("Navigation error: {0}")]
    Navigation(String),
}

impl From<rusqlite::Error> for OutputError {
    fn from(error: rusqlite::Error) -> Self {
        OutputError::Container(error.to_string())
    }
}
