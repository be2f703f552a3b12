//! Subprocess invoker - runs external tools through tokio::process

use crate::process::{
    CommandSpec, InvokeError, OutputObserver, OutputStream, ProcessInvoker, ProcessOutput,
    ProcessStatus,
};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// How long to wait for pipe readers once the process group has been killed
const READER_GRACE: Duration = Duration::from_secs(2);

/// Stand-in deadline for timeouts too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Runs commands as child processes, one call per process
///
/// Each child leads its own process group on unix, so a timeout takes down
/// everything the tool started, not only the direct child.
#[derive(Debug, Clone, Default)]
pub struct SubprocessInvoker;

impl SubprocessInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessInvoker for SubprocessInvoker {
    async fn invoke(
        &self,
        command: &CommandSpec,
        observer: Option<Arc<dyn OutputObserver>>,
    ) -> Result<ProcessOutput, InvokeError> {
        command.validate()?;
        let program = command.program().unwrap_or_default().to_string();
        let start = Instant::now();
        let deadline = start
            .checked_add(command.timeout)
            .unwrap_or_else(|| start + FAR_FUTURE);

        debug!("Spawning `{}` (timeout {:?})", command.display(), command.timeout);

        let mut cmd = Command::new(&program);
        cmd.args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn `{}`: {}", program, e);
                return Ok(ProcessOutput::spawn_failed(e.to_string(), start.elapsed()));
            }
        };
        // The id is gone once the child is reaped, the group may outlive it
        let pid = child.id();

        let stdout_buf = Arc::new(Mutex::new(String::new()));
        let stderr_buf = Arc::new(Mutex::new(String::new()));
        let mut readers: Vec<JoinHandle<()>> = [
            child.stdout.take().map(|out| {
                tokio::spawn(pump(out, OutputStream::Stdout, observer.clone(), stdout_buf.clone()))
            }),
            child.stderr.take().map(|err| {
                tokio::spawn(pump(err, OutputStream::Stderr, observer.clone(), stderr_buf.clone()))
            }),
        ]
        .into_iter()
        .flatten()
        .collect();

        let waited = timeout_at(deadline, child.wait()).await;
        let mut status = match waited {
            Ok(Ok(exit)) => match exit.code() {
                Some(code) => ProcessStatus::Exited { code },
                None => ProcessStatus::Terminated,
            },
            Ok(Err(source)) => {
                kill_process_group(pid);
                readers.iter().for_each(JoinHandle::abort);
                return Err(InvokeError::Wait { program, source });
            }
            Err(_) => {
                warn!("`{}` timed out after {:?}, killing it", program, command.timeout);
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill `{}`: {}", program, e);
                }
                timed_out(command)
            }
        };

        // Output must be drained within the same budget as the wait
        let drain_deadline = match status {
            ProcessStatus::TimedOut { .. } => Instant::now() + READER_GRACE,
            _ => deadline,
        };
        if !drain_readers(&mut readers, drain_deadline).await {
            if !matches!(status, ProcessStatus::TimedOut { .. }) {
                warn!(
                    "`{}` exited but its output stayed open past {:?}, killing leftover processes",
                    program, command.timeout
                );
                kill_process_group(pid);
                status = timed_out(command);
                drain_readers(&mut readers, Instant::now() + READER_GRACE).await;
            }
            readers.iter().for_each(JoinHandle::abort);
        }

        let stdout = take_buffer(&stdout_buf);
        let stderr = take_buffer(&stderr_buf);
        debug!(
            "`{}` finished with {} ({} bytes stdout, {} bytes stderr)",
            program,
            status,
            stdout.len(),
            stderr.len()
        );

        Ok(ProcessOutput {
            status,
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }
}

fn timed_out(command: &CommandSpec) -> ProcessStatus {
    ProcessStatus::TimedOut {
        after_secs: command.timeout.as_secs(),
    }
}

/// SIGKILL every process in the group the child leads
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid targets the group
    let rc = unsafe { libc::kill(-pid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "Process group {} not signalled: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Wait for all readers until `deadline`, returning false if any is still open
async fn drain_readers(readers: &mut [JoinHandle<()>], deadline: Instant) -> bool {
    for reader in readers.iter_mut() {
        if reader.is_finished() {
            continue;
        }
        if timeout_at(deadline, reader).await.is_err() {
            return false;
        }
    }
    true
}

/// Copy a pipe into `buffer`, forwarding each line to the observer
async fn pump<R>(
    reader: R,
    stream: OutputStream,
    observer: Option<Arc<dyn OutputObserver>>,
    buffer: Arc<Mutex<String>>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                if let Some(observer) = &observer {
                    observer.on_line(stream, text.trim_end_matches(['\n', '\r']));
                }
                if let Ok(mut buf) = buffer.lock() {
                    buf.push_str(&text);
                }
            }
            Err(e) => {
                debug!("Stopped reading {:?}: {}", stream, e);
                break;
            }
        }
    }
}

fn take_buffer(buffer: &Arc<Mutex<String>>) -> String {
    buffer
        .lock()
        .map(|mut buf| std::mem::take(&mut *buf))
        .unwrap_or_default()
}
