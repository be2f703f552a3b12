//! External process invocation

pub mod status;
pub mod subprocess;

use async_trait::async_trait;
use std::sync::Arc;

pub use status::{
    quote_argv, CommandSpec, InvokeError, OutputStream, ProcessOutput, ProcessStatus,
    DEFAULT_TIMEOUT_SECS,
};
pub use subprocess::SubprocessInvoker;

/// Receives output lines while a process is still running
pub trait OutputObserver: Send + Sync {
    fn on_line(&self, stream: OutputStream, line: &str);
}

/// Trait for process invocation - allows for scripted implementations in tests
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    /// Run one command to completion (or timeout) and capture its output
    async fn invoke(
        &self,
        command: &CommandSpec,
        observer: Option<Arc<dyn OutputObserver>>,
    ) -> Result<ProcessOutput, InvokeError>;
}
