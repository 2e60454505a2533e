//! Process runner: one invocation, one bounded attempt, one result.
//!
//! The runner never returns an error. Launch failures, non-zero exits and
//! timeouts are all captured in the [`AttemptResult`] so the driver can keep
//! a complete diagnostic trail.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::catalog::InvocationSpec;

/// Most bytes kept per stream; older output is discarded first.
const MAX_CAPTURE_BYTES: usize = 4 * 1024 * 1024;

/// How long a timed-out attempt gets between SIGTERM and SIGKILL.
#[cfg(unix)]
const TERM_GRACE: Duration = Duration::from_secs(3);

/// How long to wait for pipe readers after the process is gone. Children
/// of a killed process can hold the pipes open indefinitely.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Outcome of a single strategy attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptResult {
    /// Strategy name.
    pub strategy: String,
    /// Exit code zero.
    pub succeeded: bool,
    /// `None` when the process never started, was killed, or died by signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// The attempt hit its time limit and was killed.
    pub timed_out: bool,
    /// Spawn error, when the process could not be started.
    pub launch_error: Option<String>,
    pub elapsed: Duration,
    /// Rendered command line, for diagnostics.
    pub command: String,
}

impl AttemptResult {
    /// A process that ran to completion.
    pub fn completed(
        spec: &InvocationSpec,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        elapsed: Duration,
    ) -> Self {
        Self {
            strategy: spec.name.clone(),
            succeeded: exit_code == Some(0),
            exit_code,
            stdout,
            stderr,
            timed_out: false,
            launch_error: None,
            elapsed,
            command: spec.command_line(),
        }
    }

    /// A process that was killed for exceeding its time limit.
    pub fn timed_out(spec: &InvocationSpec, stdout: String, stderr: String, elapsed: Duration) -> Self {
        Self {
            strategy: spec.name.clone(),
            succeeded: false,
            exit_code: None,
            stdout,
            stderr,
            timed_out: true,
            launch_error: None,
            elapsed,
            command: spec.command_line(),
        }
    }

    /// A process that could not be started.
    pub fn launch_failed(spec: &InvocationSpec, error: impl Into<String>) -> Self {
        Self {
            strategy: spec.name.clone(),
            succeeded: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: false,
            launch_error: Some(error.into()),
            elapsed: Duration::ZERO,
            command: spec.command_line(),
        }
    }

    /// One-line description for logs.
    pub fn describe(&self) -> String {
        if let Some(ref e) = self.launch_error {
            format!("launch failed: {e}")
        } else if self.timed_out {
            format!("timed out after {:.1}s", self.elapsed.as_secs_f64())
        } else {
            match self.exit_code {
                Some(code) => format!("exited with code {code}"),
                None => "terminated by signal".to_string(),
            }
        }
    }
}

/// Runs one invocation under a time limit.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, spec: &InvocationSpec, limit: Duration) -> AttemptResult;
}

/// Runs invocations as child processes via `tokio::process`.
///
/// Working directory and environment come from the spec; nothing in the
/// harness's own process state is touched.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

impl CommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(&self, spec: &InvocationSpec, limit: Duration) -> AttemptResult {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout can take down the tool's children too.
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        tracing::debug!(
            strategy = %spec.name,
            command = %spec.command_line(),
            cwd = %spec.working_dir.display(),
            timeout_secs = limit.as_secs(),
            "Launching attempt"
        );

        let started = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return AttemptResult::launch_failed(
                    spec,
                    format!("failed to spawn '{}': {}", spec.program, e),
                );
            }
        };

        let stdout_buf = Arc::new(Mutex::new(Vec::new()));
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let readers = [
            child
                .stdout
                .take()
                .map(|out| tokio::spawn(drain(out, stdout_buf.clone()))),
            child
                .stderr
                .take()
                .map(|err| tokio::spawn(drain(err, stderr_buf.clone()))),
        ];

        let waited = timeout(limit, child.wait()).await;
        let timed_out = waited.is_err();
        if timed_out {
            tracing::warn!(strategy = %spec.name, "Attempt exceeded time limit, killing");
            terminate(&mut child, &spec.name).await;
        }

        for reader in readers.into_iter().flatten() {
            let abort = reader.abort_handle();
            if timeout(READER_GRACE, reader).await.is_err() {
                abort.abort();
            }
        }

        let elapsed = started.elapsed();
        let stdout = take_lossy(&stdout_buf);
        let stderr = take_lossy(&stderr_buf);

        match waited {
            Err(_) => AttemptResult::timed_out(spec, stdout, stderr, elapsed),
            Ok(Ok(status)) => AttemptResult::completed(spec, status.code(), stdout, stderr, elapsed),
            Ok(Err(e)) => {
                let mut result = AttemptResult::completed(spec, None, stdout, stderr, elapsed);
                result.launch_error = Some(format!("failed to wait for process: {e}"));
                result
            }
        }
    }
}

/// Stop a timed-out attempt and everything it started, then reap it.
async fn terminate(child: &mut Child, strategy: &str) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            let group = Pid::from_raw(pid as i32);
            if let Err(e) = killpg(group, Signal::SIGTERM) {
                tracing::debug!(strategy, error = %e, "SIGTERM to process group failed");
            }
            let exited = timeout(TERM_GRACE, child.wait()).await.is_ok();
            // Group members can outlive the leader; ESRCH here just means none did.
            let _ = killpg(group, Signal::SIGKILL);
            if exited {
                return;
            }
        }
    }

    if let Err(e) = child.kill().await {
        tracing::warn!(strategy, error = %e, "Failed to kill timed-out process");
    }
}

/// Copy a pipe into a shared buffer until EOF, keeping only the newest bytes.
async fn drain<R>(mut reader: R, sink: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut buf) = sink.lock() {
                    buf.extend_from_slice(&chunk[..n]);
                    if buf.len() > MAX_CAPTURE_BYTES {
                        let excess = buf.len() - MAX_CAPTURE_BYTES;
                        buf.drain(..excess);
                    }
                }
            }
        }
    }
}

fn take_lossy(buf: &Arc<Mutex<Vec<u8>>>) -> String {
    match buf.lock() {
        Ok(mut bytes) => String::from_utf8_lossy(&std::mem::take(&mut *bytes)).into_owned(),
        Err(_) => String::new(),
    }
}
