//! Ownership of the spawned child
//!
//! The child is moved into a single waiter task. Everyone else talks to it
//! through a cloneable [`ProcessHandle`] that can only ask for a kill. Kill
//! requests are serialized by the waiter, so two racing callers (signal relay
//! and deadline) never touch the process concurrently.

use std::io;
use std::process::ExitStatus;

use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};

/// Why a kill was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillReason {
    /// The host received the named termination signal
    Signal(&'static str),
    /// The execution deadline elapsed
    Deadline,
}

/// Final state of the child, sent once by the waiter task
#[derive(Debug)]
pub struct ExitEvent {
    pub status: io::Result<ExitStatus>,
    /// Set when the exit was caused by a kill request
    pub killed_by: Option<KillReason>,
}

struct KillRequest {
    reason: KillReason,
    reply: oneshot::Sender<io::Result<()>>,
}

/// Cloneable kill handle for a child owned by its waiter task
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: Option<u32>,
    requests: mpsc::UnboundedSender<KillRequest>,
}

impl std::fmt::Debug for KillRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KillRequest")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl ProcessHandle {
    /// Move `child` into a waiter task
    ///
    /// The returned receiver resolves once the child has exited and been
    /// reaped. Dropping the receiver before that kills the child.
    pub fn watch(child: Child) -> (Self, oneshot::Receiver<ExitEvent>) {
        let pid = child.id();
        let (requests, request_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        tokio::spawn(wait_for_exit(child, request_rx, exit_tx));

        (Self { pid, requests }, exit_rx)
    }

    /// OS process id, if the child had one when it was watched
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Forcefully kill the child and wait until it has been reaped
    ///
    /// Idempotent: killing a process that already exited returns `Ok(())`.
    pub async fn kill(&self, reason: KillReason) -> io::Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        if self.requests.send(KillRequest { reason, reply }).is_err() {
            // Waiter is gone, so the child has already been reaped
            return Ok(());
        }
        reply_rx.await.unwrap_or(Ok(()))
    }
}

async fn wait_for_exit(
    mut child: Child,
    mut requests: mpsc::UnboundedReceiver<KillRequest>,
    mut exit_tx: oneshot::Sender<ExitEvent>,
) {
    let mut killed_by = None;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(request) = requests.recv() => {
                match start_kill(&mut child) {
                    Ok(()) => {
                        tracing::debug!(pid = ?child.id(), reason = ?request.reason, "Killed command");
                        killed_by = Some(request.reason);
                        let status = child.wait().await;
                        let _ = request.reply.send(Ok(()));
                        break status;
                    }
                    Err(e) => {
                        tracing::warn!(reason = ?request.reason, "Failed to kill command: {}", e);
                        let _ = request.reply.send(Err(e));
                    }
                }
            }
            _ = exit_tx.closed() => {
                // Supervisor went away; do not leave the child behind
                if let Err(e) = start_kill(&mut child) {
                    tracing::warn!("Failed to kill abandoned command: {}", e);
                }
                let _ = child.wait().await;
                return;
            }
        }
    };

    // Later kill requests observe a closed channel and succeed as no-ops
    drop(requests);
    let _ = exit_tx.send(ExitEvent { status, killed_by });
}

fn start_kill(child: &mut Child) -> io::Result<()> {
    match child.start_kill() {
        Err(e) if is_already_gone(&e) => Ok(()),
        other => other,
    }
}

/// Kill errors that only mean the process no longer exists
fn is_already_gone(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::InvalidInput {
        return true;
    }
    #[cfg(unix)]
    {
        error.raw_os_error() == Some(nix::errno::Errno::ESRCH as i32)
    }
    #[cfg(not(unix))]
    {
        false
    }
}
