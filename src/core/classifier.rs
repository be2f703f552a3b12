//! Step outcome classification
//!
//! Maps how a process ended onto success, warning, or fatal. Some tools use
//! exit code 1 for "found fixable issues" while the same code from another
//! tool means it crashed, so the rule is chosen per step.

use crate::core::state::{FatalCause, StepOutcome};
use crate::core::step::Step;
use crate::process::ProcessStatus;
use serde::{Deserialize, Serialize};

/// Per-step rule for interpreting exit codes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExitClassifier {
    /// 0 is success, anything else is fatal
    #[default]
    Strict,
    /// 0 is success, listed codes are warnings, anything else is fatal
    Lenient {
        #[serde(default = "default_warning_codes")]
        warning_codes: Vec<i32>,
    },
    /// 0 is success, anything else is a warning
    Tolerant,
}

fn default_warning_codes() -> Vec<i32> {
    vec![1]
}

impl ExitClassifier {
    /// Style-checker rule: exit code 1 means "issues found"
    pub fn lenient() -> Self {
        ExitClassifier::Lenient {
            warning_codes: default_warning_codes(),
        }
    }

    /// Classify how a process ended
    ///
    /// Timeouts and spawn failures are fatal under every rule.
    pub fn classify(&self, status: &ProcessStatus) -> StepOutcome {
        let code = match status {
            ProcessStatus::Exited { code } => *code,
            ProcessStatus::Terminated => return StepOutcome::Fatal(FatalCause::ToolCrash),
            ProcessStatus::TimedOut { .. } => return StepOutcome::Fatal(FatalCause::Timeout),
            ProcessStatus::SpawnFailed { .. } => {
                return StepOutcome::Fatal(FatalCause::SpawnFailure)
            }
        };

        if code == 0 {
            return StepOutcome::Success;
        }

        match self {
            ExitClassifier::Strict => StepOutcome::Fatal(FatalCause::ToolCrash),
            ExitClassifier::Lenient { warning_codes } if warning_codes.contains(&code) => {
                StepOutcome::Warning
            }
            ExitClassifier::Lenient { .. } => StepOutcome::Fatal(FatalCause::ToolCrash),
            ExitClassifier::Tolerant => StepOutcome::Warning,
        }
    }
}

/// Classify a step's process status using the step's own rule
pub fn classify(step: &Step, status: &ProcessStatus) -> StepOutcome {
    step.classifier.classify(status)
}
