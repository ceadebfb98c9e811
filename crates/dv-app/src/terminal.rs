//! Terminal display for interactive mode

use std::io::{self, BufRead, Write};

use dv_render::Canvas;
use dv_views::{CanvasDisplay, OutputError, PlotManager};
use tracing::warn;

/// Prints a one-line summary per shown canvas
#[derive(Debug, Default)]
pub struct TerminalDisplay;

impl TerminalDisplay {
    pub fn summary(canvas: &Canvas, position: usize, total: usize) -> String {
        let mut line = format!(
            "[{}/{}] {} \"{}\" {}x{}",
            position + 1,
            total,
            canvas.id,
            canvas.title,
            canvas.width,
            canvas.height
        );
        for series in &canvas.series {
            line.push_str(&format!(", {} ({} pts)", series.label, series.points.len()));
        }
        line
    }
}

impl CanvasDisplay for TerminalDisplay {
    fn show(&mut self, canvas: &Canvas, position: usize, total: usize) -> Result<(), OutputError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", Self::summary(canvas, position, total))?;
        Ok(())
    }
}

/// Step through the view history from stdin
///
/// `n` next, `p` previous, a number jumps to that position, `q` quits.
pub fn navigate(manager: &mut PlotManager) -> io::Result<()> {
    if manager.history().is_empty() {
        return Ok(());
    }
    println!("n: next, p: previous, <number>: jump, q: quit");

    for line in io::stdin().lock().lines() {
        let line = line?;
        let result = match line.trim() {
            "q" | "quit" => break,
            "n" | "" => manager.show_next(),
            "p" => manager.show_previous(),
            other => match other.parse::<usize>() {
                Ok(position) if position > 0 => manager.show_at(position - 1),
                _ => {
                    println!("Unknown command '{}'", other);
                    continue;
                }
            },
        };
        if let Err(e) = result {
            warn!("{}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv_core::{PlotId, PlotProperties, ResolvedPlot};
    use dv_render::Series;

    #[test]
    fn test_summary() {
        let plot = ResolvedPlot::from_parts(PlotId::new("G", "C", "P"), Vec::new(), &PlotProperties::default());
        let mut canvas = Canvas::for_plot(&plot);
        canvas.series.push(Series {
            label: "histX (run1)".to_string(),
            points: vec![(0.0, 1.0), (1.0, 2.0)],
        });

        assert_eq!(
            TerminalDisplay::summary(&canvas, 0, 3),
            "[1/3] P_IN_G:C \"P\" 800x600, histX (run1) (2 pts)"
        );
    }
}
