//! Persisted run artifacts (JSON or Markdown)

use crate::core::PipelineResult;
use crate::process::quote_argv;
use crate::report::{transcript::format_duration, ReportError, RunReport};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Artifact format, chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Markdown,
}

impl ArtifactFormat {
    /// `.json` selects JSON, anything else Markdown
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ArtifactFormat::Json,
            _ => ArtifactFormat::Markdown,
        }
    }
}

/// Render a run in the given format
pub fn render_artifact(
    result: &PipelineResult,
    format: ArtifactFormat,
) -> Result<String, ReportError> {
    let report = RunReport::from_result(result);
    match format {
        ArtifactFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
        ArtifactFormat::Markdown => Ok(render_markdown(&report)),
    }
}

/// Write the artifact for a run, creating parent directories as needed
pub fn write_artifact(path: &Path, result: &PipelineResult) -> Result<ArtifactFormat, ReportError> {
    let format = ArtifactFormat::from_path(path);
    let content = render_artifact(result, format)?;

    let io_err = |source: std::io::Error| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, content).map_err(io_err)?;

    info!("Wrote {:?} report to {}", format, path.display());
    Ok(format)
}

fn render_markdown(report: &RunReport) -> String {
    // Writing into a String cannot fail
    let mut md = String::new();
    let _ = writeln!(md, "# Pipeline Report: {}\n", report.pipeline);
    let _ = writeln!(md, "- **Run:** `{}`", report.run_id);
    let _ = writeln!(
        md,
        "- **Result:** {}",
        if report.success { "SUCCESS" } else { "FAILURE" }
    );
    if let Some(started) = report.started_at {
        let _ = writeln!(md, "- **Started:** {}", started.to_rfc3339());
    }
    let _ = writeln!(
        md,
        "- **Elapsed:** {}\n",
        format_duration(Duration::from_millis(report.elapsed_ms as u64))
    );

    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "| Outcome | Steps |");
    let _ = writeln!(md, "|---------|-------|");
    let _ = writeln!(md, "| Success | {} |", report.counts.success);
    let _ = writeln!(md, "| Warning | {} |", report.counts.warning);
    let _ = writeln!(md, "| Fatal | {} |", report.counts.fatal);
    let _ = writeln!(md, "| Not attempted | {} |\n", report.counts.not_attempted);

    if let Some(halt) = &report.halted_at {
        let _ = writeln!(md, "## Halted\n");
        let _ = writeln!(
            md,
            "Step `{}` ({}) stopped the run: {} ({}).\n",
            halt.step_id, halt.step_name, halt.outcome, halt.status
        );
    }

    let _ = writeln!(md, "## Steps\n");
    for (index, step) in report.steps.iter().enumerate() {
        let _ = writeln!(md, "### {}. {} (`{}`)\n", index + 1, step.name, step.id);
        let _ = writeln!(md, "- **Command:** `{}`", quote_argv(&step.command));
        let _ = writeln!(md, "- **Status:** {}", step.status);
        let _ = writeln!(md, "- **Outcome:** {}", step.outcome);
        let _ = writeln!(
            md,
            "- **Duration:** {}\n",
            format_duration(Duration::from_millis(step.duration_ms as u64))
        );
        for (label, text) in [("stdout", &step.stdout), ("stderr", &step.stderr)] {
            if text.trim().is_empty() {
                continue;
            }
            let _ = writeln!(md, "<details><summary>{}</summary>\n", label);
            let _ = writeln!(md, "```\n{}\n```\n", text.trim_end());
            let _ = writeln!(md, "</details>\n");
        }
    }
    md
}
