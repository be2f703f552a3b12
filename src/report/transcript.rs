//! Human-readable transcript of a run

use crate::core::{PipelineResult, StepOutcome, StepResult};
use crate::process::quote_argv;
use console::{style, Emoji};
use std::io::{self, Write};
use std::time::Duration;

static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");

const MAX_RULE_WIDTH: usize = 72;

fn rule_width() -> usize {
    term_size::dimensions()
        .map(|(width, _)| width.min(MAX_RULE_WIDTH))
        .unwrap_or(MAX_RULE_WIDTH)
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// First `max_lines` lines of captured output
pub fn excerpt(output: &str, max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= max_lines {
        lines.iter().map(|l| l.to_string()).collect()
    } else {
        let mut kept: Vec<String> = lines[..max_lines].iter().map(|l| l.to_string()).collect();
        kept.push(format!("... ({} more lines)", lines.len() - max_lines));
        kept
    }
}

fn outcome_label(outcome: StepOutcome) -> String {
    match outcome {
        StepOutcome::Success => format!("{}{}", CHECK, style("success").green()),
        StepOutcome::Warning => format!("{}{}", WARN, style("warning").yellow()),
        StepOutcome::Fatal(cause) => format!("{}{}", CROSS, style(format!("fatal: {}", cause)).red()),
    }
}

fn write_step<W: Write>(
    out: &mut W,
    position: usize,
    total: usize,
    step: &StepResult,
    max_output_lines: usize,
) -> io::Result<()> {
    writeln!(
        out,
        "[{}/{}] {} {} ({}) in {}",
        position,
        total,
        style(step.step_name()).bold(),
        outcome_label(step.outcome()),
        step.status(),
        format_duration(step.duration())
    )?;
    writeln!(out, "    {}", style(format!("$ {}", quote_argv(step.command()))).dim())?;

    if max_output_lines == 0 {
        return Ok(());
    }
    for (label, text) in [("stdout", step.stdout()), ("stderr", step.stderr())] {
        if text.trim().is_empty() {
            continue;
        }
        writeln!(out, "    {}:", style(label).dim())?;
        for line in excerpt(text, max_output_lines) {
            writeln!(out, "      {}", line)?;
        }
    }
    Ok(())
}

/// Write the transcript of a finished run
///
/// Every recorded step is listed in order with its outcome and an excerpt of
/// its output, followed by a summary footer.
pub fn write_transcript<W: Write>(
    out: &mut W,
    result: &PipelineResult,
    max_output_lines: usize,
) -> io::Result<()> {
    let width = rule_width();
    writeln!(out, "{}", "━".repeat(width))?;
    writeln!(
        out,
        "Pipeline {} ({})",
        style(result.pipeline_name()).bold(),
        style(&result.run_id().to_string()[..8]).dim()
    )?;
    writeln!(out, "{}", "━".repeat(width))?;

    for (index, step) in result.steps().iter().enumerate() {
        write_step(out, index + 1, result.planned_steps(), step, max_output_lines)?;
    }

    writeln!(out, "{}", "─".repeat(width))?;
    writeln!(
        out,
        "Steps: {} succeeded, {} warnings, {} fatal, {} not attempted",
        style(result.success_count()).green(),
        style(result.warning_count()).yellow(),
        style(result.fatal_count()).red(),
        result.not_attempted()
    )?;
    writeln!(out, "Elapsed: {}", format_duration(result.elapsed()))?;

    if result.is_success() {
        writeln!(out, "{}Result: {}", CHECK, style("SUCCESS").green().bold())?;
    } else {
        writeln!(out, "{}Result: {}", CROSS, style("FAILURE").red().bold())?;
        if let Some(step) = result.halting_step() {
            let reason = match step.outcome().fatal_cause() {
                Some(cause) => cause.to_string(),
                None => "warning on a step that halts on warnings".to_string(),
            };
            writeln!(
                out,
                "Halted at {} ({}): {}",
                style(step.step_name()).bold(),
                step.step_id(),
                reason
            )?;
        }
    }
    Ok(())
}
