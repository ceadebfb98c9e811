//! `datavis` command-line front end

mod cli;
mod sample;
mod terminal;

use anyhow::{Context, Result};
use dv_core::{ExtractMode, OutputMode, PlotSelection};
use dv_data::{FileReader, InputSourceTable, SourcePolicy};
use dv_render::SeriesPainter;
use dv_views::{CreateReport, ManagerSettings, PlotManager};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, CreateArgs, FindArgs, InputsCommand};
use crate::terminal::TerminalDisplay;

fn main() -> Result<()> {
    let cli = cli::parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Create(args) => create(args),
        Command::Find(args) => find(args),
        Command::Inputs(InputsCommand::Add(args)) => {
            let mut table = InputSourceTable::new();
            if args.file.exists() {
                table
                    .load(&args.file, SourcePolicy::Append)
                    .with_context(|| format!("reading input table {}", args.file.display()))?;
            }
            let policy = if args.replace {
                SourcePolicy::Replace
            } else {
                SourcePolicy::Append
            };
            let changed = table.add_source(&args.identifier, args.paths, policy)?;
            table.dump(&args.file)?;
            info!(
                "Input '{}' {}",
                args.identifier,
                if changed { "updated" } else { "unchanged" }
            );
            Ok(())
        }
        Command::Inputs(InputsCommand::Show(args)) => {
            let mut table = InputSourceTable::new();
            table
                .load(&args.file, SourcePolicy::Append)
                .with_context(|| format!("reading input table {}", args.file.display()))?;
            for identifier in table.identifiers() {
                println!("{}", identifier);
                for path in table.paths(identifier).unwrap_or_default() {
                    println!("    {}", path.display());
                }
            }
            Ok(())
        }
        Command::Sample(args) => {
            let files = sample::create_sample(&args.out)?;
            println!(
                "datavis create --inputs {} --plots {} --out {}",
                files.inputs.display(),
                files.plots.display(),
                args.out.join("plots").display()
            );
            Ok(())
        }
    }
}

fn create(args: CreateArgs) -> Result<()> {
    let mode: OutputMode = args.mode.parse()?;

    let mut settings = ManagerSettings::new(&args.out);
    settings.output.use_unique_names = args.unique_names;
    if let Some(name) = args.container_name {
        settings.output.container_name = name;
    }
    let mut manager = PlotManager::new(
        Box::new(FileReader::new()),
        Box::new(SeriesPainter::new()),
        Box::new(TerminalDisplay),
    )
    .with_settings(settings);

    manager
        .load_input_files(&args.inputs)
        .with_context(|| format!("reading input table {}", args.inputs.display()))?;
    let extracted = manager
        .extract_plots_from_file(&args.plots, &args.groups, &args.names, ExtractMode::Load)
        .with_context(|| format!("reading plot file {}", args.plots.display()))?;
    if extracted.added.is_empty() {
        warn!("No plots matched in {}", args.plots.display());
        return Ok(());
    }

    let mut selection = PlotSelection::all();
    if let Some(category) = args.category {
        selection = selection.category(category);
    }
    let report = manager.create_plots(&selection, mode)?;
    print_report(&report);

    if mode == OutputMode::Interactive {
        terminal::navigate(&mut manager)?;
    }
    Ok(())
}

fn find(args: FindArgs) -> Result<()> {
    let mut manager = PlotManager::default();
    let report = manager
        .extract_plots_from_file(&args.plots, &args.groups, &args.names, ExtractMode::Find)
        .with_context(|| format!("reading plot file {}", args.plots.display()))?;

    for id in &report.found {
        println!("{}", id);
    }
    for pattern in &report.unmatched_patterns {
        println!("no match for '{}'", pattern);
    }
    Ok(())
}

fn print_report(report: &CreateReport) {
    for created in &report.created {
        match &created.output {
            Some(path) => println!("created  {} -> {}", created.id, path.display()),
            None => println!("shown    {}", created.id),
        }
    }
    for skipped in &report.skipped {
        println!("skipped  {}: {}", skipped.id, skipped.reason);
    }
    for failure in &report.load.file_errors {
        println!("unreadable {} ({}): {}", failure.path.display(), failure.input, failure.message);
    }
    println!(
        "{} created, {} skipped, {} batched read(s)",
        report.created.len(),
        report.skipped.len(),
        report.load.reads
    );
}
