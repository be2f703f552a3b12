//! CLI command definitions

use crate::core::preset::{FixKind, QualityStage};
use clap::Args;
use std::path::PathBuf;

/// Report and history options shared by every command that runs a pipeline
#[derive(Debug, Args, Clone, Default)]
pub struct OutputArgs {
    /// Write a report artifact (.json for JSON, anything else Markdown)
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Variable overrides (key=value)
    #[arg(long = "var", value_parser = parse_key_value)]
    pub variables: Vec<(String, String)>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Propose automated fixes as a pull request
#[derive(Debug, Args, Clone)]
pub struct ProposeFixCommand {
    /// Type of fix to apply
    #[arg(long = "type", default_value = "style", value_parser = parse_fix_kind)]
    pub fix_type: FixKind,

    /// Branch the pull request targets
    #[arg(long, default_value = "main")]
    pub base: String,

    /// Remote to push the fix branch to
    #[arg(long, default_value = "origin")]
    pub remote: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Fix code style in place
#[derive(Debug, Args, Clone)]
pub struct FixCommand {
    #[command(flatten)]
    pub output: OutputArgs,
}

/// Run the strict quality gate
#[derive(Debug, Args, Clone)]
pub struct CheckCommand {
    /// Run only this stage
    #[arg(long, value_parser = parse_stage)]
    pub stage: Option<QualityStage>,

    /// Attempt automatic fixes before the gate
    #[arg(long)]
    pub fix: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Pipeline name to filter by
    #[arg(short, long)]
    pub pipeline: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}

fn parse_fix_kind(s: &str) -> Result<FixKind, String> {
    match s {
        "style" => Ok(FixKind::Style),
        "analysis" => Ok(FixKind::Analysis),
        other => Err(format!(
            "Invalid fix type '{}'. Use 'style' or 'analysis'",
            other
        )),
    }
}

fn parse_stage(s: &str) -> Result<QualityStage, String> {
    s.parse()
}
