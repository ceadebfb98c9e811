//! Command-line arguments
//!
//! ```bash
//! datavis create --inputs inputs.json --plots plots.json --mode png --out plots
//! datavis find --plots plots.json --group "QA:.*" --name "pt.*"
//! datavis inputs add --file inputs.json run1 fileA.db fileB.db
//! datavis inputs show --file inputs.json
//! datavis sample --out demo
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Plot definition manager with deduplicated data loading
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "datavis")]
#[command(version)]
#[command(about = "Create plots from booked definitions, reading every dataset once")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Load plots from a plot file and create them
    Create(CreateArgs),

    /// Report which plots of a plot file match the patterns
    Find(FindArgs),

    /// Edit or print an input table file
    #[command(subcommand)]
    Inputs(InputsCommand),

    /// Write a sample container, input table and plot file
    Sample(SampleArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CreateArgs {
    /// Input table file
    #[arg(long)]
    pub inputs: PathBuf,

    /// Plot definition file
    #[arg(long)]
    pub plots: PathBuf,

    /// Figure group pattern, optionally `group:category` (repeatable)
    #[arg(long = "group")]
    pub groups: Vec<String>,

    /// Plot name pattern (repeatable)
    #[arg(long = "name")]
    pub names: Vec<String>,

    /// Only create plots of this exact category
    #[arg(long)]
    pub category: Option<String>,

    /// Output mode: svg, png, file, macro, container or interactive
    #[arg(long, default_value = "svg")]
    pub mode: String,

    /// Output directory
    #[arg(long, default_value = "plots")]
    pub out: PathBuf,

    /// Append the figure group to file names
    #[arg(long)]
    pub unique_names: bool,

    /// Container file name for container mode
    #[arg(long)]
    pub container_name: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct FindArgs {
    /// Plot definition file
    #[arg(long)]
    pub plots: PathBuf,

    /// Figure group pattern (repeatable)
    #[arg(long = "group")]
    pub groups: Vec<String>,

    /// Plot name pattern (repeatable)
    #[arg(long = "name")]
    pub names: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum InputsCommand {
    /// Register files for an input identifier
    Add(InputsAddArgs),

    /// Print the input table
    Show(InputsShowArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct InputsAddArgs {
    /// Input table file, created when missing
    #[arg(long)]
    pub file: PathBuf,

    /// Replace the identifier's files instead of appending
    #[arg(long)]
    pub replace: bool,

    /// Input identifier
    pub identifier: String,

    /// Files backing the identifier, searched in order
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct InputsShowArgs {
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SampleArgs {
    /// Directory receiving the sample files
    #[arg(long, default_value = "sample")]
    pub out: PathBuf,
}

/// Parse arguments from any iterator
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
