//! Supervised command execution
//!
//! Launches a command and races its completion against a deadline:
//! - Both output streams are drained concurrently and optionally mirrored
//! - Host termination signals are relayed to the child as kills
//! - The deadline kills the child and discards whatever was captured
//!
//! Results are all-or-nothing. Either both captured streams come back, or an
//! error does and the bytes are dropped.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::oneshot;

use super::capture::{OutputCapture, StreamCapture};
use super::process::{ExitEvent, KillReason, ProcessHandle};
use super::signal::{HostSignals, SignalRelay};
use crate::config::{ExecutionConfig, RunOption};
use crate::error::{RunError, StreamName};

/// Captured output of a command that completed successfully
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Run a command with the default configuration adjusted by `options`
///
/// # Arguments
/// * `program` - The program to execute
/// * `args` - Command arguments
/// * `options` - Overrides applied in order, later ones winning
///
/// # Errors
/// * `RunError::Start` - The command could not be launched; returned immediately
/// * `RunError::Exit` - The command exited with a non-success status
/// * `RunError::Interrupted` - The host got a termination signal and the command was killed
/// * `RunError::StreamCapture` - Reading or mirroring one of the streams failed
/// * `RunError::Timeout` - The deadline elapsed; the command was killed and its
///   output discarded
/// * `RunError::Kill` - A kill request failed to terminate the command
///
/// # Signal handling
/// Each call subscribes to the host's termination signals for its duration.
/// tokio installs a process-wide handler on the first subscription and never
/// restores the default disposition, so after the first run SIGINT, SIGTERM,
/// SIGHUP and SIGABRT no longer terminate the host on their own. Callers that
/// rely on the default behavior must handle those signals themselves.
pub async fn run<P, I, S, O>(program: P, args: I, options: O) -> Result<RunOutput, RunError>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    O: IntoIterator<Item = RunOption>,
{
    let config = ExecutionConfig::default().with_options(options);
    run_with_config(config, program, args).await
}

/// Run a command with a fully resolved configuration
///
/// Same errors and signal handling as [`run`].
pub async fn run_with_config<P, I, S>(
    config: ExecutionConfig,
    program: P,
    args: I,
) -> Result<RunOutput, RunError>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program_name = program.as_ref().to_string_lossy().into_owned();

    let mut cmd = Command::new(program.as_ref());
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let signals = HostSignals::subscribe().map_err(RunError::SignalSetup)?;

    tracing::debug!(
        program = %program_name,
        deadline_ms = config.deadline.as_millis() as u64,
        mirror = config.mirror_output,
        "Starting command"
    );

    let mut child = cmd.spawn().map_err(|source| RunError::Start {
        program: program_name,
        source,
    })?;

    let capture = OutputCapture::start(
        child.stdout.take(),
        child.stderr.take(),
        config.mirror_output,
    );
    let (process, exit) = ProcessHandle::watch(child);
    let relay = SignalRelay::arm(signals, process.clone());

    race(config.deadline, capture, process, exit, relay).await
}

/// Race completion against the deadline and relayed kills
async fn race(
    deadline: Duration,
    capture: OutputCapture,
    process: ProcessHandle,
    exit: oneshot::Receiver<ExitEvent>,
    mut relay: SignalRelay,
) -> Result<RunOutput, RunError> {
    // Drains are joined before the exit status is looked at
    let completion = async move {
        let (stdout, stderr) = capture.join().await;
        let exit = exit.await;
        (stdout, stderr, exit)
    };

    tokio::select! {
        (stdout, stderr, exit) = completion => {
            let exit = exit.map_err(|_| {
                RunError::Wait(std::io::Error::other("process waiter stopped"))
            })?;
            resolve(stdout, stderr, exit, deadline)
        }
        _ = tokio::time::sleep(deadline) => expire(&process, deadline).await,
        Some(outcome) = relay.next_outcome() => {
            // The child is reaped; pipes inherited by its own children may stay open
            match outcome.result {
                Ok(()) => {
                    tracing::debug!(signal = outcome.signal, "Command killed by relayed signal");
                    Err(RunError::Interrupted { signal: outcome.signal })
                }
                Err(e) => {
                    tracing::warn!(signal = outcome.signal, "Relayed kill failed: {}", e);
                    Err(RunError::Kill(e))
                }
            }
        }
    }
}

/// Turn a completed run into its all-or-nothing result
fn resolve(
    stdout: StreamCapture,
    stderr: StreamCapture,
    exit: ExitEvent,
    deadline: Duration,
) -> Result<RunOutput, RunError> {
    let status = exit.status.map_err(RunError::Wait)?;

    match exit.killed_by {
        Some(KillReason::Signal(signal)) => return Err(RunError::Interrupted { signal }),
        Some(KillReason::Deadline) => return Err(RunError::Timeout { deadline }),
        None => {}
    }

    if !status.success() {
        return Err(RunError::Exit { status });
    }

    Ok(RunOutput {
        stdout: stdout.into_result(StreamName::Stdout)?,
        stderr: stderr.into_result(StreamName::Stderr)?,
    })
}

async fn expire(process: &ProcessHandle, deadline: Duration) -> Result<RunOutput, RunError> {
    tracing::debug!(
        pid = ?process.id(),
        deadline_ms = deadline.as_millis() as u64,
        "Deadline elapsed, killing command"
    );
    process
        .kill(KillReason::Deadline)
        .await
        .map_err(RunError::Kill)?;
    Err(RunError::Timeout { deadline })
}

/// Run a command synchronously (convenience wrapper for sync contexts)
///
/// Builds a current-thread runtime for the duration of the call. Failing to
/// build it is reported as `RunError::Runtime`.
pub fn run_blocking<P, I, S, O>(program: P, args: I, options: O) -> Result<RunOutput, RunError>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    O: IntoIterator<Item = RunOption>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(RunError::Runtime)?;

    rt.block_on(run(program, args, options))
}
