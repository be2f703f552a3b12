//! Pipeline domain model

use crate::core::{
    config::PipelineConfig,
    step::{Step, StepDefaults},
};
use crate::process::CommandSpec;
use std::collections::HashMap;
use std::path::PathBuf;

/// An ordered list of steps plus the variables rendered into them
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Variables substituted into step commands
    pub variables: HashMap<String, String>,

    /// Base working directory for all steps
    pub working_dir: Option<PathBuf>,

    /// Steps in execution order
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: HashMap::new(),
            working_dir: None,
            steps: Vec::new(),
        }
    }

    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let defaults = StepDefaults {
            timeout_secs: config
                .default_timeout_secs
                .unwrap_or_else(|| StepDefaults::default().timeout_secs),
        };

        Pipeline {
            name: config.name.clone(),
            variables: config.variables_as_string_map(),
            working_dir: config.working_dir.clone(),
            steps: config
                .steps
                .iter()
                .map(|step_config| Step::from_config(step_config, &defaults))
                .collect(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Resolve the effective working directory of a step
    pub fn working_dir_for(&self, step: &Step) -> Option<PathBuf> {
        match (&self.working_dir, &step.working_dir) {
            (_, Some(dir)) if dir.is_absolute() => Some(dir.clone()),
            (Some(base), Some(dir)) => Some(base.join(dir)),
            (None, Some(dir)) => Some(dir.clone()),
            (Some(base), None) => Some(base.clone()),
            (None, None) => None,
        }
    }

    /// Build the concrete command for a step
    pub fn command_for(&self, step: &Step) -> CommandSpec {
        let mut spec = CommandSpec::new(step.render_command(&self.variables))
            .with_timeout(step.timeout);
        spec.working_dir = self.working_dir_for(step);
        spec
    }

    /// Placeholders that no variable resolves, as (step id, name) pairs
    pub fn unresolved_placeholders(&self) -> Vec<(String, String)> {
        self.steps
            .iter()
            .flat_map(|step| {
                step.placeholders()
                    .into_iter()
                    .filter(|name| !self.variables.contains_key(name))
                    .map(|name| (step.id.clone(), name))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}
