#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::Path,
    process::{ExitStatus, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncReadExt, BufReader},
    process::{Child, Command},
    sync::Notify,
    time::timeout,
};

use crate::constants::TIMEOUT_EXIT_CODE;

/// Failures of the process layer that callers may want to tell apart.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ProcessError {
    /// The argument vector was empty.
    #[error("empty command line")]
    EmptyCommand,
    /// The run was cancelled before or while the process ran.
    #[error("grading run was cancelled")]
    Cancelled,
}

/// Shared state behind a [`CancelToken`].
#[derive(Debug, Default)]
struct CancelState {
    /// Set once, never cleared.
    cancelled: AtomicBool,
    /// Wakes invocations waiting on their child.
    notify:    Notify,
}

/// One cancellation signal for a whole grading run, honored whenever a
/// process is spawned or awaited.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<CancelState>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Running children are killed and later
    /// invocations fail immediately.
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Drop guard that terminates a spawned child process if the invocation is
/// abandoned (deadline, cancellation).
struct ChildDropGuard(Option<Child>);

impl ChildDropGuard {
    /// Wraps the provided child process with the drop guard.
    fn new(child: Child) -> Self {
        Self(Some(child))
    }

    /// Returns a mutable reference to the underlying child process.
    fn child_mut(&mut self) -> Result<&mut Child> {
        self.0
            .as_mut()
            .context("child process already taken from guard")
    }

    /// Prevents the guard from killing the process on drop.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for ChildDropGuard {
    fn drop(&mut self) {
        if let Some(child) = self.0.as_mut() {
            let _ = child.start_kill();
        }
    }
}

/// Captured result of a finished (or killed) external invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Exit code; [`TIMEOUT_EXIT_CODE`] when the deadline was hit, negative
    /// signal number when killed by a signal.
    pub code:      i32,
    /// Everything written to stdout, lossily decoded.
    pub stdout:    String,
    /// Everything written to stderr, lossily decoded.
    pub stderr:    String,
    /// Wall-clock time from spawn to completion.
    pub duration:  Duration,
    /// Whether the process was killed at its deadline.
    pub timed_out: bool,
}

impl Invocation {
    /// Whether the process exited 0 before its deadline.
    pub fn success(&self) -> bool {
        self.code == 0 && !self.timed_out
    }

    /// stdout followed by stderr.
    pub fn combined_output(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs `argv` to completion with stdin closed, capturing its output.
///
/// * `argv`: program followed by its arguments
/// * `cwd`: working directory, inherited when `None`
/// * `deadline`: the process is killed once this elapses and the invocation
///   reports [`TIMEOUT_EXIT_CODE`]
/// * `cancel`: run-wide cancellation, checked before spawning and while
///   waiting
pub async fn run_command(
    argv: &[String],
    cwd: Option<&Path>,
    deadline: Duration,
    cancel: &CancelToken,
) -> Result<Invocation> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
    if cancel.is_cancelled() {
        return Err(ProcessError::Cancelled.into());
    }

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    tracing::debug!(command = %argv.join(" "), ?deadline, "spawning");
    let start = Instant::now();
    let mut guard = ChildDropGuard::new(
        cmd.spawn()
            .with_context(|| format!("failed to spawn `{program}`"))?,
    );

    let stdout = guard
        .child_mut()?
        .stdout
        .take()
        .context("missing stdout pipe")?;
    let stderr = guard
        .child_mut()?
        .stderr
        .take()
        .context("missing stderr pipe")?;

    let out_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stdout")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let err_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .context("failed to read stderr")?;
        Ok::<Vec<u8>, anyhow::Error>(buf)
    });

    let wait_future = async move {
        let mut guard = guard;
        let status = guard
            .child_mut()?
            .wait()
            .await
            .context("failed to wait on process")?;
        let stdout = out_task.await.context("stdout task join error")??;
        let stderr = err_task.await.context("stderr task join error")??;
        guard.disarm();
        Ok::<_, anyhow::Error>((status, stdout, stderr))
    };

    // Dropping `wait_future` drops the guard, which kills the child.
    let waited = tokio::select! {
        waited = timeout(deadline, wait_future) => waited,
        _ = cancel.cancelled() => {
            tracing::debug!(command = %argv.join(" "), "cancelled");
            return Err(ProcessError::Cancelled.into());
        }
    };
    let duration = start.elapsed();

    match waited {
        Ok(collected) => {
            let (status, stdout, stderr) = collected?;
            let code = exit_code(status);
            tracing::debug!(command = %argv.join(" "), code, ?duration, "finished");
            Ok(Invocation {
                code,
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
                duration,
                timed_out: false,
            })
        }
        Err(_) => {
            tracing::warn!(command = %argv.join(" "), ?deadline, "timed out, process killed");
            Ok(Invocation {
                code: TIMEOUT_EXIT_CODE,
                stdout: String::new(),
                stderr: "timeout".to_string(),
                duration,
                timed_out: true,
            })
        }
    }
}

/// Maps an exit status to a single integer, using the negated signal number
/// for signal-terminated processes on Unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}
