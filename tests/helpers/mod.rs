//! Test utility functions for toolpipe

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use toolpipe::core::{FatalCause, Pipeline, PipelineResult, RunStatus, StepOutcome};
use toolpipe::execution::{PipelineRunner, RunEvent};
use toolpipe::process::{
    CommandSpec, InvokeError, OutputObserver, OutputStream, ProcessInvoker, ProcessOutput,
    ProcessStatus,
};

/// Invoker that answers each command from a script
///
/// Keys are either `"program subcommand"` (e.g. `"git push"`) or a bare
/// program name; the more specific key wins. Unscripted commands exit 0.
/// Every invocation is recorded.
#[derive(Clone, Default)]
pub struct ScriptedInvoker {
    script: Arc<HashMap<String, ProcessStatus>>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedInvoker {
    pub fn new(script: &[(&str, ProcessStatus)]) -> Self {
        Self {
            script: Arc::new(
                script
                    .iter()
                    .map(|(program, status)| (program.to_string(), status.clone()))
                    .collect(),
            ),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Argument vectors of every invocation, in order
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        command: &CommandSpec,
        observer: Option<Arc<dyn OutputObserver>>,
    ) -> Result<ProcessOutput, InvokeError> {
        command.validate()?;
        self.calls.lock().unwrap().push(command.argv.clone());

        let program = command.program().unwrap_or_default().to_string();
        let with_subcommand = command
            .args()
            .first()
            .map(|sub| format!("{} {}", program, sub));
        let status = with_subcommand
            .and_then(|key| self.script.get(&key))
            .or_else(|| self.script.get(&program))
            .cloned()
            .unwrap_or(ProcessStatus::Exited { code: 0 });

        let stdout = format!("{} ran\n", program);
        if let Some(observer) = observer {
            observer.on_line(OutputStream::Stdout, stdout.trim_end());
        }

        Ok(ProcessOutput {
            status,
            stdout,
            stderr: String::new(),
            duration: Duration::from_millis(10),
        })
    }
}

/// Shorthand for a real exit code
pub fn exit(code: i32) -> ProcessStatus {
    ProcessStatus::Exited { code }
}

/// Result of a scripted run plus everything observed along the way
pub struct ScenarioResult {
    pub result: PipelineResult,
    pub calls: Vec<Vec<String>>,
    pub events: Vec<RunEvent>,
}

impl ScenarioResult {
    pub fn outcome_of(&self, step_id: &str) -> Option<StepOutcome> {
        self.result.step(step_id).map(|s| s.outcome())
    }

    pub fn executed_steps(&self) -> Vec<String> {
        self.result
            .steps()
            .iter()
            .map(|s| s.step_id().to_string())
            .collect()
    }
}

/// Run a pipeline against a scripted invoker
pub async fn run_with_script(pipeline: &Pipeline, script: &[(&str, ProcessStatus)]) -> ScenarioResult {
    let invoker = ScriptedInvoker::new(script);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let runner = PipelineRunner::new(invoker.clone())
        .with_event_handler(move |event| sink.lock().unwrap().push(event));
    let result = runner.run(pipeline).await;

    let events = events.lock().unwrap().clone();
    ScenarioResult {
        result,
        calls: invoker.calls(),
        events,
    }
}

/// Assert the run completed (success)
pub fn assert_pipeline_completed(scenario: &ScenarioResult) {
    assert_eq!(
        scenario.result.status(),
        RunStatus::Completed,
        "expected completed run, got {:?} after {:?}",
        scenario.result.status(),
        scenario.executed_steps()
    );
    assert!(scenario.result.is_success());
}

/// Assert the run was aborted (failure)
pub fn assert_pipeline_aborted(scenario: &ScenarioResult) {
    assert_eq!(scenario.result.status(), RunStatus::Aborted);
    assert!(!scenario.result.is_success());
}

pub fn assert_step_outcome(scenario: &ScenarioResult, step_id: &str, expected: StepOutcome) {
    assert_eq!(
        scenario.outcome_of(step_id),
        Some(expected),
        "unexpected outcome for step {}",
        step_id
    );
}

pub fn assert_step_fatal(scenario: &ScenarioResult, step_id: &str, cause: FatalCause) {
    assert_step_outcome(scenario, step_id, StepOutcome::Fatal(cause));
}

pub fn assert_execution_order(scenario: &ScenarioResult, expected: &[&str]) {
    assert_eq!(scenario.executed_steps(), expected);
}
