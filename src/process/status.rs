//! Process invocation types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default timeout for long-running tools (one hour)
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Error types for process invocation
///
/// Spawn failures and timeouts are not errors: they are reported through
/// [`ProcessStatus`] so callers always get a result to classify.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Timeout must be a positive duration")]
    InvalidTimeout,

    #[error("Failed waiting for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// A single external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable followed by its arguments
    pub argv: Vec<String>,

    /// Working directory (inherits the current one when `None`)
    pub working_dir: Option<PathBuf>,

    /// Maximum wall-clock time before the process is killed
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            working_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The executable (first argv element)
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    /// Arguments after the executable
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }

    /// Check the invocation preconditions
    pub fn validate(&self) -> Result<(), InvokeError> {
        match self.program() {
            None => return Err(InvokeError::EmptyCommand),
            Some(program) if program.trim().is_empty() => return Err(InvokeError::EmptyCommand),
            Some(_) => {}
        }
        if self.timeout.is_zero() {
            return Err(InvokeError::InvalidTimeout);
        }
        Ok(())
    }

    /// Shell-like rendering for logs and transcripts
    pub fn display(&self) -> String {
        quote_argv(&self.argv)
    }
}

/// Join an argv for display, quoting empty arguments and ones with whitespace
pub fn quote_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("{:?}", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// How a child process ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Process exited on its own with this code
    Exited { code: i32 },
    /// Process was terminated by a signal and has no exit code
    Terminated,
    /// Process outlived its timeout and was killed
    TimedOut { after_secs: u64 },
    /// Process could not be started
    SpawnFailed { reason: String },
}

impl ProcessStatus {
    /// The real exit code, if the process produced one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessStatus::Exited { code } => Some(*code),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Exited { code } => write!(f, "exit code {}", code),
            ProcessStatus::Terminated => write!(f, "terminated by signal"),
            ProcessStatus::TimedOut { after_secs } => write!(f, "timed out after {}s", after_secs),
            ProcessStatus::SpawnFailed { reason } => write!(f, "failed to start: {}", reason),
        }
    }
}

/// Captured result of one process invocation
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ProcessStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutput {
    /// Output for a process that never started
    pub fn spawn_failed(reason: impl Into<String>, duration: Duration) -> Self {
        Self {
            status: ProcessStatus::SpawnFailed {
                reason: reason.into(),
            },
            stdout: String::new(),
            stderr: String::new(),
            duration,
        }
    }
}

/// Which pipe a line of output came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_split() {
        let spec = CommandSpec::new(vec!["git".to_string(), "add".to_string(), ".".to_string()]);
        assert_eq!(spec.program(), Some("git"));
        assert_eq!(spec.args(), &["add".to_string(), ".".to_string()]);
        assert_eq!(spec.timeout, Duration::from_secs(3600));
    }

    #[test]
    fn test_empty_command_rejected() {
        let spec = CommandSpec::new(vec![]);
        assert!(matches!(spec.validate(), Err(InvokeError::EmptyCommand)));
        assert!(spec.args().is_empty());

        let blank = CommandSpec::new(vec!["  ".to_string()]);
        assert!(matches!(blank.validate(), Err(InvokeError::EmptyCommand)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let spec = CommandSpec::new(vec!["true".to_string()]).with_timeout(Duration::ZERO);
        assert!(matches!(spec.validate(), Err(InvokeError::InvalidTimeout)));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new(vec![
            "git".to_string(),
            "commit".to_string(),
            "-m".to_string(),
            "style: fix".to_string(),
        ]);
        assert_eq!(spec.display(), "git commit -m \"style: fix\"");
    }

    #[test]
    fn test_exit_code_only_for_real_exits() {
        assert_eq!(ProcessStatus::Exited { code: 2 }.exit_code(), Some(2));
        assert_eq!(ProcessStatus::TimedOut { after_secs: 1 }.exit_code(), None);
        assert_eq!(ProcessStatus::Terminated.exit_code(), None);
    }
}
