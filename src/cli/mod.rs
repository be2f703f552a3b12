//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    CheckCommand, FixCommand, HistoryCommand, ProposeFixCommand, RunCommand, ValidateCommand,
};
use std::ffi::OsString;
use std::path::PathBuf;

/// Run external tool pipelines with per-step exit code rules
#[derive(Debug, Parser, Clone)]
#[command(name = "toolpipe")]
#[command(version)]
#[command(about = "Run external tool pipelines with per-step exit code rules", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Stream tool output while steps run
    #[arg(short, long, global = true)]
    pub stream: bool,

    /// Lines of captured output shown per step in the transcript
    #[arg(long, global = true, default_value_t = 5)]
    pub output_lines: usize,

    /// Run tools in this directory
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline from a YAML file
    Run(RunCommand),

    /// Create a branch, apply automated fixes, push and open a pull request
    ProposeFix(ProposeFixCommand),

    /// Fix code style in place
    Fix(FixCommand),

    /// Run the strict quality gate
    Check(CheckCommand),

    /// Validate a pipeline configuration
    Validate(ValidateCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
