//! CLI output formatting

use crate::{
    core::{RunStatus, StepOutcome},
    execution::RunEvent,
    persistence::RunRecord,
    process::OutputStream,
    report::format_duration,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner for a running step
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(template);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Aborted => style("ABORTED").red().to_string(),
    }
}

fn outcome_icon(outcome: StepOutcome) -> Emoji<'static, 'static> {
    match outcome {
        StepOutcome::Success => CHECK,
        StepOutcome::Warning => WARN,
        StepOutcome::Fatal(_) => CROSS,
    }
}

/// Format a history record for display
pub fn format_run_record(record: &RunRecord) -> String {
    let icon = if record.is_success() { CHECK } else { CROSS };
    let mut line = format!(
        "{} {} - {} - {} - {} ({} ok, {} warnings, {} fatal of {}) in {}",
        icon,
        style(&record.run_id.to_string()[..8]).dim(),
        style(&record.pipeline_name).bold(),
        style(record.started_at.format("%Y-%m-%d %H:%M:%S")).dim(),
        format_status(record.status),
        record.success_steps,
        record.warning_steps,
        record.fatal_steps,
        record.planned_steps,
        format_duration(Duration::from_millis(record.elapsed_ms))
    );
    if let Some(step) = &record.failed_step {
        line.push_str(&format!(" halted at {}", style(step).red()));
    }
    line
}

/// Format a run event for display
///
/// Returns `None` for events that have no console line of their own.
pub fn format_run_event(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::PipelineStarted {
            run_id,
            pipeline_name,
            total_steps,
        } => Some(format!(
            "{}Running {} ({} steps, {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(&run_id.to_string()[..8]).dim()
        )),
        RunEvent::StepStarted { .. } => None,
        RunEvent::StepOutput { step_id, stream, line } => {
            let prefix = match stream {
                OutputStream::Stdout => style(format!("{} |", step_id)).dim(),
                OutputStream::Stderr => style(format!("{} !", step_id)).yellow(),
            };
            Some(format!("  {} {}", prefix, line))
        }
        RunEvent::StepFinished {
            step_name,
            outcome,
            status,
            duration,
            ..
        } => {
            let label = match outcome {
                StepOutcome::Success => style(outcome.to_string()).green(),
                StepOutcome::Warning => style(format!("{} ({})", outcome, status)).yellow(),
                StepOutcome::Fatal(_) => style(format!("{} ({})", outcome, status)).red(),
            };
            Some(format!(
                "{}{} {} {}",
                outcome_icon(*outcome),
                style(step_name).bold(),
                label,
                style(format_duration(*duration)).dim()
            ))
        }
        RunEvent::PipelineFinished { .. } => None,
    }
}

/// Live console progress driven by run events
pub struct ConsoleProgress {
    spinner: Mutex<Option<ProgressBar>>,
    stream: bool,
}

impl ConsoleProgress {
    pub fn new(stream: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            stream,
        }
    }

    pub fn handle(&self, event: &RunEvent) {
        let Ok(mut spinner) = self.spinner.lock() else {
            return;
        };
        match event {
            RunEvent::StepStarted {
                step_name,
                position,
                command,
                ..
            } => {
                let message = format!("[{}] {} {}", position, step_name, style(command).dim());
                if self.stream {
                    println!("{}{}", SPINNER, message);
                } else {
                    *spinner = Some(create_spinner(message));
                }
            }
            RunEvent::StepFinished { .. } => {
                if let Some(bar) = spinner.take() {
                    bar.finish_and_clear();
                }
                if let Some(line) = format_run_event(event) {
                    println!("{}", line);
                }
            }
            _ => {
                if let Some(line) = format_run_event(event) {
                    println!("{}", line);
                }
            }
        }
    }
}
