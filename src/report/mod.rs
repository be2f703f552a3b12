//! Run reports: a console transcript and a persisted artifact

pub mod artifact;
pub mod transcript;

pub use artifact::{render_artifact, write_artifact, ArtifactFormat};
pub use transcript::{format_duration, write_transcript};

use crate::core::{PipelineResult, RunStatus, StepOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while emitting a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Outcome counts for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub warning: usize,
    pub fatal: usize,
    pub not_attempted: usize,
}

/// The step that stopped an aborted run
#[derive(Debug, Clone, Serialize)]
pub struct HaltInfo {
    pub step_id: String,
    pub step_name: String,
    pub outcome: StepOutcome,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub id: String,
    pub name: String,
    pub command: Vec<String>,
    pub status: String,
    pub exit_code: Option<i32>,
    pub outcome: StepOutcome,
    pub duration_ms: u128,
    pub started_at: DateTime<Utc>,
    pub stdout: String,
    pub stderr: String,
}

/// Serializable summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub pipeline: String,
    pub success: bool,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u128,
    pub planned_steps: usize,
    pub counts: OutcomeCounts,
    pub halted_at: Option<HaltInfo>,
    pub steps: Vec<StepReport>,
}

impl RunReport {
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            run_id: result.run_id(),
            pipeline: result.pipeline_name().to_string(),
            success: result.is_success(),
            status: result.status(),
            started_at: result.started_at(),
            finished_at: result.finished_at(),
            elapsed_ms: result.elapsed().as_millis(),
            planned_steps: result.planned_steps(),
            counts: OutcomeCounts {
                success: result.success_count(),
                warning: result.warning_count(),
                fatal: result.fatal_count(),
                not_attempted: result.not_attempted(),
            },
            halted_at: result.halting_step().map(|step| HaltInfo {
                step_id: step.step_id().to_string(),
                step_name: step.step_name().to_string(),
                outcome: step.outcome(),
                status: step.status().to_string(),
            }),
            steps: result
                .steps()
                .iter()
                .map(|step| StepReport {
                    id: step.step_id().to_string(),
                    name: step.step_name().to_string(),
                    command: step.command().to_vec(),
                    status: step.status().to_string(),
                    exit_code: step.status().exit_code(),
                    outcome: step.outcome(),
                    duration_ms: step.duration().as_millis(),
                    started_at: step.started_at(),
                    stdout: step.stdout().to_string(),
                    stderr: step.stderr().to_string(),
                })
                .collect(),
        }
    }
}
