use std::{fmt, path::PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_OUTPUT_FILENAME;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean and combine PsychoPy trial logs into one CSV table",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge every session CSV in a directory into one cleaned table
    Build(BuildArgs),
    /// Show which expected columns each session file provides
    Inspect(InspectArgs),
    /// Write or display the pipeline configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Directory holding the per-session CSV files (not searched recursively)
    #[arg(short = 'd', long = "dir")]
    pub dir: Option<PathBuf>,
    /// Output file name; `.csv` is appended when missing
    #[arg(short = 'o', long = "output", default_value = DEFAULT_OUTPUT_FILENAME)]
    pub output: String,
    /// Directory to place the output file in (defaults to the working directory)
    #[arg(long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Column policy for the combined table
    #[arg(long, value_enum, default_value_t = OutputMode::Summary)]
    pub mode: OutputMode,
    /// Pipeline configuration YAML (defaults to the built-in ERM layout)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Character encoding of the session files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Render the first N combined rows as a table instead of writing a file
    #[arg(long, num_args = 0..=1, default_missing_value = "10")]
    pub preview: Option<usize>,
    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Directory holding the per-session CSV files
    #[arg(short = 'd', long = "dir")]
    pub dir: PathBuf,
    /// Pipeline configuration YAML (defaults to the built-in ERM layout)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Character encoding of the session files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write the default configuration as YAML
    Init(ConfigInitArgs),
    /// Print the effective configuration
    Show(ConfigShowArgs),
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Destination file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ConfigShowArgs {
    /// Configuration file to load and print
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

/// Which columns each session contributes to the combined table.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Priority columns only
    Summary,
    /// Priority columns followed by every other column
    Full,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Summary
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Summary => f.write_str("summary"),
            OutputMode::Full => f.write_str("full"),
        }
    }
}
