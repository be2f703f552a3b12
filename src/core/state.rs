//! Execution state models

use crate::core::step::Step;
use crate::process::{ProcessOutput, ProcessStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Overall pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run has not started
    Pending,
    /// Steps are being executed
    Running,
    /// Every step was attempted and none halted the run
    Completed,
    /// A step halted the run; later steps were not attempted
    Aborted,
}

impl RunStatus {
    /// Check if the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Aborted)
    }
}

/// Why a step was classified fatal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalCause {
    /// Nonzero exit not recognized as benign for the step
    ToolCrash,
    /// Process did not finish within its timeout
    Timeout,
    /// Executable could not be started
    SpawnFailure,
}

impl fmt::Display for FatalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalCause::ToolCrash => write!(f, "tool crash"),
            FatalCause::Timeout => write!(f, "timeout"),
            FatalCause::SpawnFailure => write!(f, "spawn failure"),
        }
    }
}

/// Classification of a finished step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "cause", rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    /// Tool reported benign issues; the pipeline may continue
    Warning,
    Fatal(FatalCause),
}

impl StepOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::Fatal(_))
    }

    pub fn fatal_cause(&self) -> Option<FatalCause> {
        match self {
            StepOutcome::Fatal(cause) => Some(*cause),
            _ => None,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Success => write!(f, "success"),
            StepOutcome::Warning => write!(f, "warning"),
            StepOutcome::Fatal(cause) => write!(f, "fatal ({})", cause),
        }
    }
}

/// Recorded outcome of executing one step
///
/// Fields are read-only once recorded.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    step_id: String,
    step_name: String,
    command: Vec<String>,
    status: ProcessStatus,
    stdout: String,
    stderr: String,
    duration: Duration,
    started_at: DateTime<Utc>,
    outcome: StepOutcome,
}

impl StepResult {
    /// Build a result from a finished process, classifying it with the step's rule
    pub fn new(
        step: &Step,
        command: Vec<String>,
        output: ProcessOutput,
        started_at: DateTime<Utc>,
    ) -> Self {
        let outcome = step.classify(&output.status);
        Self {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            command,
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
            duration: output.duration,
            started_at,
            outcome,
        }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// The rendered argv that was executed
    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn status(&self) -> &ProcessStatus {
        &self.status
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn outcome(&self) -> StepOutcome {
        self.outcome
    }
}

/// Ordered aggregation of all step results for one run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    run_id: Uuid,
    pipeline_name: String,
    status: RunStatus,
    planned_steps: usize,
    steps: Vec<StepResult>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    elapsed: Duration,
}

impl PipelineResult {
    /// Create an empty, pending result
    pub fn new(pipeline_name: impl Into<String>, planned_steps: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline_name: pipeline_name.into(),
            status: RunStatus::Pending,
            planned_steps,
            steps: Vec::new(),
            started_at: None,
            finished_at: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Mark the run as started
    pub(crate) fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Append a finished step
    pub(crate) fn record(&mut self, result: StepResult) {
        debug_assert_eq!(self.status, RunStatus::Running);
        self.steps.push(result);
    }

    /// Mark the run as completed
    pub(crate) fn complete(&mut self, elapsed: Duration) {
        self.status = RunStatus::Completed;
        self.finish(elapsed);
    }

    /// Mark the run as aborted
    pub(crate) fn abort(&mut self, elapsed: Duration) {
        self.status = RunStatus::Aborted;
        self.finish(elapsed);
    }

    fn finish(&mut self, elapsed: Duration) {
        self.finished_at = Some(Utc::now());
        self.elapsed = elapsed;
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn planned_steps(&self) -> usize {
        self.planned_steps
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Total wall-clock time of the run
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Overall success: the run completed without being aborted
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn success_count(&self) -> usize {
        self.count(|o| o == StepOutcome::Success)
    }

    pub fn warning_count(&self) -> usize {
        self.count(|o| o == StepOutcome::Warning)
    }

    pub fn fatal_count(&self) -> usize {
        self.count(|o| o.is_fatal())
    }

    /// Steps that were never attempted because the run halted
    pub fn not_attempted(&self) -> usize {
        self.planned_steps.saturating_sub(self.steps.len())
    }

    /// The step that halted an aborted run
    pub fn halting_step(&self) -> Option<&StepResult> {
        match self.status {
            RunStatus::Aborted => self.steps.last(),
            _ => None,
        }
    }

    fn count(&self, predicate: impl Fn(StepOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| predicate(s.outcome)).count()
    }
}
