use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use toolpipe::cli::commands::{
    CheckCommand, HistoryCommand, OutputArgs, ProposeFixCommand, RunCommand, ValidateCommand,
};
use toolpipe::cli::output::*;
use toolpipe::cli::{Cli, Command};
use toolpipe::core::config::PipelineConfig;
use toolpipe::core::preset::{
    fix_pipeline, propose_fix_pipeline, quality_pipeline, ProposeFixOptions, QualityOptions,
};
use toolpipe::execution::PipelineRunner;
use toolpipe::persistence::{record_from_result, HistoryBackend};
use toolpipe::process::SubprocessInvoker;
use toolpipe::report::{write_artifact, write_transcript};
use toolpipe::Pipeline;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let usage_error = e.use_stderr();
            let _ = e.print();
            std::process::exit(if usage_error { 1 } else { 0 });
        }
    };

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let success = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await?,
        Command::ProposeFix(cmd) => propose_fix(cmd, &cli).await?,
        Command::Fix(cmd) => execute_pipeline(fix_pipeline(), &cli, &cmd.output, true).await?,
        Command::Check(cmd) => check(cmd, &cli).await?,
        Command::Validate(cmd) => validate_pipeline(cmd),
        Command::History(cmd) => show_history(cmd).await?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Point the pipeline at the `-C` directory, keeping relative working dirs relative to it
fn apply_dir(mut pipeline: Pipeline, dir: Option<&Path>) -> Pipeline {
    if let Some(dir) = dir {
        pipeline.working_dir = Some(match &pipeline.working_dir {
            Some(wd) if wd.is_absolute() => wd.clone(),
            Some(wd) => dir.join(wd),
            None => dir.to_path_buf(),
        });
    }
    pipeline
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<bool> {
    let config = PipelineConfig::load(&cmd.file, &cmd.variables)
        .context("Failed to load pipeline config")?;

    println!("{}Loaded pipeline: {}", INFO, style(&config.name).bold());
    for (key, value) in &cmd.variables {
        println!(
            "{}Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let pipeline = apply_dir(config.to_pipeline(), cli.dir.as_deref());
    execute_pipeline(pipeline, cli, &cmd.output, false).await
}

async fn propose_fix(cmd: &ProposeFixCommand, cli: &Cli) -> Result<bool> {
    let mut options = ProposeFixOptions::new(cmd.fix_type);
    options.base = cmd.base.clone();
    options.remote = cmd.remote.clone();
    println!(
        "{}Proposing {} fixes on branch {}",
        INFO,
        style(cmd.fix_type).cyan(),
        style(&options.branch).bold()
    );

    let pipeline = apply_dir(propose_fix_pipeline(&options), cli.dir.as_deref());
    execute_pipeline(pipeline, cli, &cmd.output, false).await
}

async fn check(cmd: &CheckCommand, cli: &Cli) -> Result<bool> {
    let options = QualityOptions {
        stage: cmd.stage,
        auto_fix: cmd.fix,
    };
    let pipeline = apply_dir(quality_pipeline(options), cli.dir.as_deref());
    execute_pipeline(pipeline, cli, &cmd.output, false).await
}

/// Run a pipeline, print its transcript, then write the report and history
async fn execute_pipeline(
    pipeline: Pipeline,
    cli: &Cli,
    output: &OutputArgs,
    stream_by_default: bool,
) -> Result<bool> {
    let stream = cli.stream || stream_by_default;
    let progress = Arc::new(ConsoleProgress::new(stream));
    let runner = PipelineRunner::new(SubprocessInvoker::new())
        .stream_output(stream)
        .with_event_handler(move |event| progress.handle(&event));

    let result = runner.run(&pipeline).await;

    println!();
    let stdout = std::io::stdout();
    write_transcript(&mut stdout.lock(), &result, cli.output_lines)
        .context("Failed to write transcript")?;

    if let Some(path) = &output.report {
        match write_artifact(path, &result) {
            Ok(format) => println!(
                "{}Report ({:?}) written to {}",
                INFO,
                format,
                style(path.display()).dim()
            ),
            Err(e) => println!("{}{}", WARN, style(e).yellow()),
        }
    }

    if !output.no_history {
        let record = record_from_result(&result);
        match open_history().await {
            Ok(store) => match store.save_run(&record).await {
                Ok(()) => debug!("Saved run {} to history", record.run_id),
                Err(e) => warn!("Failed to save run history: {:#}", e),
            },
            Err(e) => warn!("History unavailable: {:#}", e),
        }
    }

    Ok(result.is_success())
}

#[cfg(feature = "sqlite")]
async fn open_history() -> Result<Box<dyn HistoryBackend>> {
    Ok(Box::new(
        toolpipe::persistence::SqliteHistory::with_default_path().await?,
    ))
}

#[cfg(not(feature = "sqlite"))]
async fn open_history() -> Result<Box<dyn HistoryBackend>> {
    anyhow::bail!("toolpipe was built without the sqlite feature")
}

fn validate_pipeline(cmd: &ValidateCommand) -> bool {
    println!("{}Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{}Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Variables: {}", style(config.variable_count()).cyan());

            if cmd.json {
                match serde_json::to_string_pretty(&config) {
                    Ok(json) => println!("\n{}", json),
                    Err(e) => println!("{}{}", WARN, e),
                }
            }
            true
        }
        Err(e) => {
            println!("{}Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            false
        }
    }
}

async fn show_history(cmd: &HistoryCommand) -> Result<bool> {
    let store = open_history().await?;
    let runs = store.list_runs(cmd.pipeline.as_deref(), cmd.limit).await?;

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(true);
    }

    if runs.is_empty() {
        println!("{}No runs found", INFO);
        return Ok(true);
    }

    println!("{}Run history (showing latest {}):", INFO, cmd.limit);
    for record in &runs {
        println!("  {}", format_run_record(record));
    }

    Ok(true)
}
