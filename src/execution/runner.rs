//! Pipeline runner - executes steps in order and stops at the first halting outcome

use crate::{
    core::{FatalCause, Pipeline, PipelineResult, RunStatus, Step, StepOutcome, StepResult},
    process::{OutputObserver, OutputStream, ProcessInvoker, ProcessOutput, ProcessStatus},
};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during a pipeline run
#[derive(Debug, Clone)]
pub enum RunEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        step_id: String,
        step_name: String,
        /// 1-based position in the pipeline
        position: usize,
        command: String,
    },
    /// A line of live output, only emitted when streaming is enabled
    StepOutput {
        step_id: String,
        stream: OutputStream,
        line: String,
    },
    StepFinished {
        step_id: String,
        step_name: String,
        outcome: StepOutcome,
        status: ProcessStatus,
        duration: Duration,
    },
    PipelineFinished {
        run_id: Uuid,
        status: RunStatus,
        elapsed: Duration,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

/// Sequential pipeline runner
pub struct PipelineRunner<I> {
    invoker: I,
    event_handlers: Vec<EventHandler>,
    stream_output: bool,
}

impl<I: ProcessInvoker> PipelineRunner<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            event_handlers: Vec::new(),
            stream_output: false,
        }
    }

    /// Add an event handler
    pub fn with_event_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
        self
    }

    /// Forward process output lines to handlers while steps run
    pub fn stream_output(mut self, enabled: bool) -> Self {
        self.stream_output = enabled;
        self
    }

    fn emit(&self, event: RunEvent) {
        emit_to(&self.event_handlers, event);
    }

    /// Run every step of the pipeline in order
    ///
    /// Never fails: invocation problems are recorded as fatal step results.
    pub async fn run(&self, pipeline: &Pipeline) -> PipelineResult {
        let start = Instant::now();
        let mut result = PipelineResult::new(pipeline.name.clone(), pipeline.steps().len());
        result.start();

        info!(
            "Starting pipeline: {} ({} steps, run {})",
            pipeline.name,
            pipeline.steps().len(),
            result.run_id()
        );
        self.emit(RunEvent::PipelineStarted {
            run_id: result.run_id(),
            pipeline_name: pipeline.name.clone(),
            total_steps: pipeline.steps().len(),
        });

        let mut halted = false;
        for (index, step) in pipeline.steps().iter().enumerate() {
            let step_result = self.run_step(pipeline, step, index + 1).await;
            let outcome = step_result.outcome();
            result.record(step_result);

            if step.halts_on(outcome) {
                halted = true;
                break;
            }
        }

        let elapsed = start.elapsed();
        if halted {
            result.abort(elapsed);
        } else {
            result.complete(elapsed);
        }

        info!(
            "Pipeline finished: {} - {:?} ({} ok, {} warnings, {} fatal)",
            pipeline.name,
            result.status(),
            result.success_count(),
            result.warning_count(),
            result.fatal_count()
        );
        self.emit(RunEvent::PipelineFinished {
            run_id: result.run_id(),
            status: result.status(),
            elapsed,
        });

        result
    }

    async fn run_step(&self, pipeline: &Pipeline, step: &Step, position: usize) -> StepResult {
        let command = pipeline.command_for(step);
        let started_at = Utc::now();

        info!("Running step {}: {}", step.id, step.name);
        debug!("argv for {}: {:?}", step.id, command.argv);
        self.emit(RunEvent::StepStarted {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            position,
            command: command.display(),
        });

        let observer: Option<Arc<dyn OutputObserver>> = if self.stream_output {
            Some(Arc::new(EventObserver {
                step_id: step.id.clone(),
                handlers: self.event_handlers.clone(),
            }))
        } else {
            None
        };

        let clock = Instant::now();
        let output = match self.invoker.invoke(&command, observer).await {
            Ok(output) => output,
            Err(e) => ProcessOutput::spawn_failed(e.to_string(), clock.elapsed()),
        };
        debug!(
            "Step {} captured {} bytes stdout, {} bytes stderr",
            step.id,
            output.stdout.len(),
            output.stderr.len()
        );

        let result = StepResult::new(step, command.argv, output, started_at);
        log_outcome(&result);

        self.emit(RunEvent::StepFinished {
            step_id: step.id.clone(),
            step_name: step.name.clone(),
            outcome: result.outcome(),
            status: result.status().clone(),
            duration: result.duration(),
        });

        result
    }
}

fn emit_to(handlers: &[EventHandler], event: RunEvent) {
    for handler in handlers {
        handler(event.clone());
    }
}

fn log_outcome(result: &StepResult) {
    match result.outcome() {
        StepOutcome::Success => info!(
            "Step {} succeeded in {:?}",
            result.step_id(),
            result.duration()
        ),
        StepOutcome::Warning => warn!(
            "Step {} finished with warnings ({})",
            result.step_id(),
            result.status()
        ),
        StepOutcome::Fatal(FatalCause::SpawnFailure) => error!(
            "Step {} could not start: {}",
            result.step_id(),
            result.status()
        ),
        StepOutcome::Fatal(cause) => error!(
            "Step {} failed: {} ({})",
            result.step_id(),
            cause,
            result.status()
        ),
    }
}

/// Turns live process output into `StepOutput` events
struct EventObserver {
    step_id: String,
    handlers: Vec<EventHandler>,
}

impl OutputObserver for EventObserver {
    fn on_line(&self, stream: OutputStream, line: &str) {
        emit_to(
            &self.handlers,
            RunEvent::StepOutput {
                step_id: self.step_id.clone(),
                stream,
                line: line.to_string(),
            },
        );
    }
}
