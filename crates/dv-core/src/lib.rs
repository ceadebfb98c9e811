//! Core functionality for the plotting framework
//!
//! This crate provides the fundamental abstractions shared by every other
//! crate: the name registry, the plot definition model, selection filters
//! and the output modes a batch of plots can be routed to.

pub mod names;
pub mod navigation;
pub mod output;
pub mod plot;
pub mod selection;

use thiserror::Error;

// Re-export commonly used types
pub use names::{NameId, NameRegistry};
pub use navigation::ViewHistory;
pub use output::{ImageFormat, OutputMode};
pub use plot::{
    DataRef, DrawStyle, PlotDefinition, PlotId, PlotProperties, PlotTemplate, ResolvedPlot,
};
pub use selection::{ExtractMode, PatternSelection, PlotSelection};

/// Errors raised by the core model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Name must not be empty")]
    EmptyName,

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Unknown output mode '{0}' (expected interactive, file, svg, png, macro or container)")]
    UnknownOutputMode(String),

    #[error("Unknown extract mode '{0}' (expected load or find)")]
    UnknownExtractMode(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
