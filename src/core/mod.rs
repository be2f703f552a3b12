//! Core domain models for toolpipe
//!
//! This module defines the fundamental data structures that represent
//! pipelines, steps, their configuration and the results of running them.

pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod preset;
pub mod state;
pub mod step;

pub use classifier::ExitClassifier;
pub use pipeline::*;
pub use state::*;
pub use step::*;
