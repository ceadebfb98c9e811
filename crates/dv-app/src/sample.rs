//! Create a sample container with demo datasets, plus matching input and
//! plot files

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dv_core::{DataRef, DrawStyle, PlotDefinition, PlotProperties, PlotSelection, PlotTemplate};
use dv_data::{InputSourceTable, SourcePolicy};
use dv_templates::PlotStore;
use rusqlite::{params, Connection};
use tracing::info;

pub const SAMPLE_CONTAINER: &str = "sample_run.db";
pub const SAMPLE_INPUTS: &str = "inputs.json";
pub const SAMPLE_PLOTS: &str = "plots.json";

/// Files written by [`create_sample`]
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFiles {
    pub container: PathBuf,
    pub inputs: PathBuf,
    pub plots: PathBuf,
}

/// Write the sample files into `dir`
pub fn create_sample(dir: &Path) -> Result<SampleFiles> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let files = SampleFiles {
        container: dir.join(SAMPLE_CONTAINER),
        inputs: dir.join(SAMPLE_INPUTS),
        plots: dir.join(SAMPLE_PLOTS),
    };

    if files.container.exists() {
        fs::remove_file(&files.container)?;
    }
    let conn = Connection::open(&files.container)?;
    create_spectrum(&conn)?;
    create_distribution(&conn)?;
    create_efficiency(&conn)?;
    info!("Sample container written to {}", files.container.display());

    let mut inputs = InputSourceTable::new();
    inputs.add_source("sample", [files.container.clone()], SourcePolicy::Replace)?;
    inputs.dump(&files.inputs)?;

    sample_store()?.dump_plots(&files.plots, &PlotSelection::all())?;
    info!("Sample plot file written to {}", files.plots.display());

    Ok(files)
}

/// Falling transverse momentum spectrum
fn create_spectrum(conn: &Connection) -> Result<()> {
    conn.execute("CREATE TABLE histPt (pt REAL, counts REAL)", [])?;
    let mut stmt = conn.prepare("INSERT INTO histPt (pt, counts) VALUES (?1, ?2)")?;
    for bin in 0..50 {
        let pt = 0.25 + bin as f64 * 0.5;
        stmt.execute(params![pt, 1.0e5 * (-pt / 1.8).exp()])?;
    }
    Ok(())
}

/// Flat-top pseudorapidity distribution
fn create_distribution(conn: &Connection) -> Result<()> {
    conn.execute("CREATE TABLE histEta (eta REAL, counts INTEGER)", [])?;
    let mut stmt = conn.prepare("INSERT INTO histEta (eta, counts) VALUES (?1, ?2)")?;
    for bin in 0..40 {
        let eta = -2.0 + bin as f64 * 0.1;
        let counts = (1000.0 * (-(eta * eta) / 8.0).exp()).round() as i64;
        stmt.execute(params![eta, counts])?;
    }
    Ok(())
}

/// Efficiency with a few unmeasured bins
fn create_efficiency(conn: &Connection) -> Result<()> {
    conn.execute("CREATE TABLE \"eff/pt\" (pt REAL, efficiency REAL)", [])?;
    let mut stmt = conn.prepare("INSERT INTO \"eff/pt\" (pt, efficiency) VALUES (?1, ?2)")?;
    for bin in 0..20 {
        let pt = 0.5 + bin as f64;
        let efficiency = (bin % 7 != 3).then(|| 0.95 * (1.0 - (-pt).exp()));
        stmt.execute(params![pt, efficiency])?;
    }
    Ok(())
}

fn sample_store() -> Result<PlotStore> {
    let mut store = PlotStore::new();
    store.add_template(PlotTemplate::new("spectrum").with_properties(PlotProperties {
        x_label: Some("pT (GeV/c)".to_string()),
        y_label: Some("counts".to_string()),
        log_y: Some(true),
        ..Default::default()
    }))?;

    store.add_plot(
        PlotDefinition::new("QA", "Tracking", "pt")
            .with_template("spectrum")
            .with_data(DataRef::new("sample", "histPt").with_columns("pt", "counts")),
    )?;
    store.add_plot(
        PlotDefinition::new("QA", "Tracking", "eta")
            .with_data(DataRef::new("sample", "histEta").with_columns("eta", "counts"))
            .with_properties(PlotProperties {
                x_label: Some("eta".to_string()),
                draw_style: Some(DrawStyle::Points),
                ..Default::default()
            }),
    )?;
    store.add_plot(
        PlotDefinition::new("Results", "Efficiency", "pt")
            .with_data(DataRef::new("sample", "eff/pt").with_label("efficiency"))
            .with_properties(PlotProperties {
                title: Some("Tracking efficiency".to_string()),
                y_range: Some((0.0, 1.0)),
                ..Default::default()
            }),
    )?;
    store.add_plot(
        PlotDefinition::new("Results", "Efficiency", "missing")
            .with_data(DataRef::new("sample", "histDoesNotExist")),
    )?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_templates::PlotFile;

    #[test]
    fn test_sample_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = create_sample(dir.path()).unwrap();

        let plots = PlotFile::read(&files.plots).unwrap();
        assert_eq!(plots.plots.len(), 4);
        assert_eq!(plots.templates.len(), 1);

        let mut inputs = InputSourceTable::new();
        inputs.load(&files.inputs, SourcePolicy::Append).unwrap();
        assert_eq!(inputs.paths("sample").unwrap(), &[files.container.clone()]);

        // rewriting over an existing sample works
        create_sample(dir.path()).unwrap();
    }
}
