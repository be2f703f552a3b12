//! Step domain model

use crate::core::{
    classifier::ExitClassifier,
    config::StepConfig,
    state::StepOutcome,
};
use crate::process::{ProcessStatus, DEFAULT_TIMEOUT_SECS};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// A single external-tool invocation in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name
    pub name: String,

    /// Command template (executable first), may contain `{{ variable }}` placeholders
    pub command: Vec<String>,

    /// Working directory, relative to the pipeline's when not absolute
    pub working_dir: Option<PathBuf>,

    /// Maximum run time before the process is killed
    pub timeout: Duration,

    /// Rule for interpreting the exit status
    pub classifier: ExitClassifier,

    /// Whether a warning lets the pipeline continue
    pub continue_on_warning: bool,
}

#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

impl Step {
    /// Create a strict step with the default timeout
    pub fn new(id: impl Into<String>, name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            command,
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            classifier: ExitClassifier::Strict,
            continue_on_warning: true,
        }
    }

    /// Create a step from a step config
    pub fn from_config(config: &StepConfig, defaults: &StepDefaults) -> Self {
        let timeout_secs = config.timeout_secs.unwrap_or(defaults.timeout_secs);
        Step {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            command: config.command.clone(),
            working_dir: config.working_dir.clone(),
            timeout: Duration::from_secs(timeout_secs),
            classifier: config.classifier.clone(),
            continue_on_warning: config.continue_on_warning,
        }
    }

    pub fn with_classifier(mut self, classifier: ExitClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Stop the pipeline when this step only produces a warning
    pub fn halt_on_warning(mut self) -> Self {
        self.continue_on_warning = false;
        self
    }

    /// Render the command with variable substitution
    ///
    /// Placeholders in the form `{{ name }}` are replaced; unknown names are
    /// left untouched.
    pub fn render_command(&self, variables: &HashMap<String, String>) -> Vec<String> {
        self.command
            .iter()
            .map(|arg| {
                placeholder_regex()
                    .replace_all(arg, |caps: &regex::Captures| {
                        variables
                            .get(&caps[1])
                            .cloned()
                            .unwrap_or_else(|| caps[0].to_string())
                    })
                    .into_owned()
            })
            .collect()
    }

    /// Names of all placeholders used in the command
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .command
            .iter()
            .flat_map(|arg| {
                placeholder_regex()
                    .captures_iter(arg)
                    .map(|caps| caps[1].to_string())
                    .collect::<Vec<_>>()
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Classify how this step's process ended
    pub fn classify(&self, status: &ProcessStatus) -> StepOutcome {
        self.classifier.classify(status)
    }

    /// Whether an outcome of this step stops the pipeline
    pub fn halts_on(&self, outcome: StepOutcome) -> bool {
        match outcome {
            StepOutcome::Success => false,
            StepOutcome::Warning => !self.continue_on_warning,
            StepOutcome::Fatal(_) => true,
        }
    }
}
