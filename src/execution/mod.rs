//! Pipeline execution

pub mod runner;

pub use runner::{EventHandler, PipelineRunner, RunEvent};
