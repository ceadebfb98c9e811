//! Plot export functionality

use std::fs;
use std::path::{Path, PathBuf};

use dv_core::output::MACRO_EXTENSION;
use dv_core::{ImageFormat, PlotId};
use dv_render::Canvas;
use tracing::info;

use crate::OutputError;

/// Default name of the consolidated container file
pub const DEFAULT_CONTAINER_NAME: &str = "ResultPlots.db";

/// Where exported plots land
///
/// Per-plot files go to `<directory>/<group>/<category>/<stem>.<ext>`; the
/// category level is left out when the plot has none.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTarget {
    pub directory: PathBuf,
    /// Append the figure group to file names (`name_IN_group`)
    pub use_unique_names: bool,
    pub container_name: String,
}

impl Default for OutputTarget {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            use_unique_names: false,
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
        }
    }
}

impl OutputTarget {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Default::default()
        }
    }

    /// Directory holding the outputs of one plot
    pub fn plot_directory(&self, id: &PlotId) -> PathBuf {
        let mut dir = self.directory.join(&id.figure_group);
        if !id.figure_category.is_empty() {
            dir.push(&id.figure_category);
        }
        dir
    }

    /// Full output path of one plot for a file extension
    pub fn path_for(&self, id: &PlotId, extension: &str) -> PathBuf {
        self.plot_directory(id)
            .join(format!("{}.{}", id.file_stem(self.use_unique_names), extension))
    }

    /// Key of a plot inside the container file
    pub fn container_key(&self, id: &PlotId) -> String {
        id.relative_path(self.use_unique_names)
    }

    pub fn container_path(&self) -> PathBuf {
        self.directory.join(&self.container_name)
    }

    /// Create the output directory itself
    pub fn ensure_directory(&self) -> Result<(), OutputError> {
        ensure_dir(&self.directory)
    }

    /// Write a canvas as an image file
    pub fn write_image(&self, canvas: &Canvas, format: ImageFormat) -> Result<PathBuf, OutputError> {
        let path = self.prepare(&canvas.id, format.extension())?;
        match format {
            ImageFormat::Svg => fs::write(&path, canvas.to_svg()?)?,
            ImageFormat::Png => canvas.write_png(&path)?,
        }
        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Write a canvas as a replayable macro
    pub fn write_macro(&self, canvas: &Canvas) -> Result<PathBuf, OutputError> {
        let path = self.prepare(&canvas.id, MACRO_EXTENSION)?;
        fs::write(&path, canvas.to_macro()?)?;
        info!("Wrote macro {}", path.display());
        Ok(path)
    }

    fn prepare(&self, id: &PlotId, extension: &str) -> Result<PathBuf, OutputError> {
        ensure_dir(&self.plot_directory(id))?;
        Ok(self.path_for(id, extension))
    }
}

fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    if dir.exists() && !dir.is_dir() {
        return Err(OutputError::InvalidDirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir)?;
    Ok(())
}
