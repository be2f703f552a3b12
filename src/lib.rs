//! toolpipe - sequential external tool pipelines with per-step exit code rules

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod process;
pub mod report;

// Re-export commonly used types
pub use crate::core::{
    ExitClassifier, FatalCause, Pipeline, PipelineResult, RunStatus, Step, StepOutcome,
    StepResult,
};
pub use execution::{PipelineRunner, RunEvent};
pub use process::{CommandSpec, ProcessInvoker, ProcessOutput, ProcessStatus, SubprocessInvoker};
