//! Display collaborator for interactive output

use dv_render::Canvas;

use crate::OutputError;

/// Receiver of canvases in interactive mode
pub trait CanvasDisplay {
    /// Show a canvas; `position` is its 0-based slot in the view history
    /// and `total` the history length
    fn show(&mut self, canvas: &Canvas, position: usize, total: usize) -> Result<(), OutputError>;
}

/// Display that discards everything, for headless use
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl CanvasDisplay for NullDisplay {
    fn show(&mut self, _canvas: &Canvas, _position: usize, _total: usize) -> Result<(), OutputError> {
        Ok(())
    }
}
