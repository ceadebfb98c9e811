//! Consolidated container export
//!
//! All canvases of one batch go into a single SQLite file. Rows are keyed
//! by `group/category/stem`, so the container mirrors the per-plot
//! directory layout and re-exporting a plot replaces its row.

use std::path::{Path, PathBuf};

use dv_core::PlotId;
use dv_render::Canvas;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::OutputError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS canvases (
    path TEXT PRIMARY KEY,
    figure_group TEXT NOT NULL,
    figure_category TEXT NOT NULL,
    name TEXT NOT NULL,
    svg TEXT NOT NULL,
    macro TEXT NOT NULL
)";

/// Open container file, alive for one batch
pub struct ContainerWriter {
    conn: Connection,
    path: PathBuf,
    written: usize,
}

impl ContainerWriter {
    /// Open (or create) the container file
    pub fn open(path: &Path) -> Result<Self, OutputError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute(SCHEMA, [])?;
        debug!("Opened container {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            written: 0,
        })
    }

    /// Store one canvas under `key`
    pub fn write(&mut self, key: &str, canvas: &Canvas) -> Result<(), OutputError> {
        let id: &PlotId = &canvas.id;
        self.conn.execute(
            "INSERT OR REPLACE INTO canvases (path, figure_group, figure_category, name, svg, macro)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key,
                id.figure_group,
                id.figure_category,
                id.name,
                canvas.to_svg()?,
                canvas.to_macro()?
            ],
        )?;
        self.written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the file; returns the number of canvases written
    pub fn finish(self) -> Result<usize, OutputError> {
        let written = self.written;
        let path = self.path;
        self.conn.close().map_err(|(_, e)| OutputError::from(e))?;
        info!("Wrote {} canvas(es) to container {}", written, path.display());
        Ok(written)
    }

    /// Keys stored in a container file, sorted
    pub fn stored_keys(path: &Path) -> Result<Vec<String>, OutputError> {
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn.prepare("SELECT path FROM canvases ORDER BY path")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Restore one canvas from its stored macro
    pub fn read_canvas(path: &Path, key: &str) -> Result<Option<Canvas>, OutputError> {
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        let mut stmt = conn.prepare("SELECT macro FROM canvases WHERE path = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => {
                let script: String = row.get(0)?;
                Ok(Some(Canvas::from_macro(&script)?))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_core::{PlotProperties, ResolvedPlot};
    use dv_render::Series;

    fn canvas(name: &str, y: f64) -> Canvas {
        let plot = ResolvedPlot::from_parts(PlotId::new("G", "C", name), Vec::new(), &PlotProperties::default());
        let mut canvas = Canvas::for_plot(&plot);
        canvas.series.push(Series {
            label: "s".to_string(),
            points: vec![(0.0, y), (1.0, y + 1.0)],
        });
        canvas
    }

    #[test]
    fn test_write_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("ResultPlots.db");

        let mut writer = ContainerWriter::open(&path).unwrap();
        writer.write("G/C/a", &canvas("a", 1.0)).unwrap();
        writer.write("G/C/b", &canvas("b", 1.0)).unwrap();
        assert_eq!(writer.finish().unwrap(), 2);

        let mut writer = ContainerWriter::open(&path).unwrap();
        writer.write("G/C/a", &canvas("a", 5.0)).unwrap();
        writer.finish().unwrap();

        assert_eq!(ContainerWriter::stored_keys(&path).unwrap(), vec!["G/C/a", "G/C/b"]);
        let restored = ContainerWriter::read_canvas(&path, "G/C/a").unwrap().unwrap();
        assert_eq!(restored.series[0].points[0], (0.0, 5.0));
        assert!(ContainerWriter::read_canvas(&path, "G/C/zzz").unwrap().is_none());
    }
}
