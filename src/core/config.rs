//! Pipeline configuration from YAML

use crate::core::{classifier::ExitClassifier, Pipeline};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Base working directory for all steps
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Variables rendered into `{{ name }}` placeholders (scalars only)
    #[serde(default)]
    variables: HashMap<String, Value>,

    /// Pipeline steps, in execution order
    pub steps: Vec<StepConfig>,

    /// Default timeout for steps (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step identifier
    pub id: String,

    /// Human-readable step name (defaults to the id)
    #[serde(default)]
    pub name: Option<String>,

    /// Optional step description
    #[serde(default)]
    pub description: Option<String>,

    /// Executable followed by its arguments
    pub command: Vec<String>,

    /// Working directory, relative to the pipeline's
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Timeout for this step (overrides the pipeline default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// How the exit status is interpreted
    #[serde(default)]
    pub classifier: ExitClassifier,

    /// Whether a warning lets the pipeline continue
    #[serde(default = "default_continue_on_warning")]
    pub continue_on_warning: bool,
}

fn default_continue_on_warning() -> bool {
    true
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(path, &[])
    }

    /// Load a pipeline file, applying variable overrides before validation
    pub fn load<P: AsRef<Path>>(path: P, overrides: &[(String, String)]) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: PipelineConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        for (key, value) in overrides {
            config.set_variable(key.clone(), value.clone());
        }
        config.validate()?;
        Ok(config)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }

        if self.steps.is_empty() {
            anyhow::bail!("Pipeline '{}' has no steps", self.name);
        }

        if self.default_timeout_secs == Some(0) {
            anyhow::bail!("default_timeout_secs must be positive");
        }

        let mut seen_ids = HashSet::new();
        for step in &self.steps {
            if !seen_ids.insert(&step.id) {
                anyhow::bail!("Duplicate step ID: {}", step.id);
            }

            if step.command.first().map_or(true, |exe| exe.trim().is_empty()) {
                anyhow::bail!("Step '{}' has an empty command", step.id);
            }

            if step.timeout_secs == Some(0) {
                anyhow::bail!("Step '{}' timeout_secs must be positive", step.id);
            }

            if let ExitClassifier::Lenient { warning_codes } = &step.classifier {
                if warning_codes.contains(&0) {
                    anyhow::bail!(
                        "Step '{}' lists exit code 0 as a warning; 0 is always success",
                        step.id
                    );
                }
            }
        }

        for (key, value) in &self.variables {
            if scalar_to_string(value).is_none() {
                anyhow::bail!("Variable '{}' must be a string, number or boolean", key);
            }
        }

        let pipeline = self.to_pipeline();
        if let Some((step_id, name)) = pipeline.unresolved_placeholders().into_iter().next() {
            anyhow::bail!(
                "Step '{}' references undefined variable '{}'",
                step_id,
                name
            );
        }

        Ok(())
    }

    /// Get variables as string map
    pub fn variables_as_string_map(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
            .collect()
    }

    /// Define or override a variable
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), Value::String(value.into()));
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
