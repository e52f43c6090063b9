//! Relay of host termination signals to the child
//!
//! [`HostSignals`] is subscribed right before launch so no signal can slip in
//! between spawn and arming. [`SignalRelay`] then forwards every received
//! signal as one kill request. Dropping the relay unsubscribes, so nothing
//! outlives the run that created it.

use std::io;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::process::{KillReason, ProcessHandle};

/// Per-run subscription to host termination signals
///
/// The first subscription to a signal kind installs tokio's process-wide
/// handler for it, and that handler is never removed. From then on
/// SIGINT, SIGTERM, SIGHUP and SIGABRT no longer terminate the host by
/// default; a signal arriving while no run is active is swallowed.
#[derive(Debug)]
pub struct HostSignals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
    #[cfg(unix)]
    abort: tokio::signal::unix::Signal,
    #[cfg(unix)]
    hangup: tokio::signal::unix::Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
    #[cfg(windows)]
    ctrl_break: tokio::signal::windows::CtrlBreak,
}

impl HostSignals {
    /// Subscribe to SIGINT, SIGTERM, SIGABRT and SIGHUP (Ctrl-C/Ctrl-Break on Windows)
    ///
    /// Dropping the subscription does not restore the default disposition.
    #[cfg(unix)]
    pub fn subscribe() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            abort: signal(SignalKind::from_raw(nix::sys::signal::Signal::SIGABRT as i32))?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    #[cfg(windows)]
    pub fn subscribe() -> io::Result<Self> {
        use tokio::signal::windows::{ctrl_break, ctrl_c};

        Ok(Self {
            ctrl_c: ctrl_c()?,
            ctrl_break: ctrl_break()?,
        })
    }

    /// Wait for the next signal and return its name
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            Some(()) = self.interrupt.recv() => Some("SIGINT"),
            Some(()) = self.terminate.recv() => Some("SIGTERM"),
            Some(()) = self.abort.recv() => Some("SIGABRT"),
            Some(()) = self.hangup.recv() => Some("SIGHUP"),
            else => None,
        }
    }

    #[cfg(windows)]
    pub async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            Some(()) = self.ctrl_c.recv() => Some("CTRL_C"),
            Some(()) = self.ctrl_break.recv() => Some("CTRL_BREAK"),
            else => None,
        }
    }
}

/// Result of one relayed kill
#[derive(Debug)]
pub struct KillOutcome {
    pub signal: &'static str,
    pub result: io::Result<()>,
}

/// Listener task forwarding host signals as kill requests
///
/// Unsubscribes when dropped.
#[derive(Debug)]
pub struct SignalRelay {
    token: CancellationToken,
    outcomes: mpsc::UnboundedReceiver<KillOutcome>,
}

impl SignalRelay {
    pub fn arm(mut signals: HostSignals, process: ProcessHandle) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let signal = tokio::select! {
                    _ = cancelled.cancelled() => break,
                    signal = signals.recv() => match signal {
                        Some(signal) => signal,
                        None => break,
                    },
                };

                tracing::debug!(signal, pid = ?process.id(), "Relaying termination signal to command");
                let result = process.kill(KillReason::Signal(signal)).await;
                if outcome_tx.send(KillOutcome { signal, result }).is_err() {
                    break;
                }
            }
        });

        Self { token, outcomes }
    }

    /// Relay fed from a channel instead of a listener task
    #[cfg(test)]
    pub(crate) fn from_outcomes(outcomes: mpsc::UnboundedReceiver<KillOutcome>) -> Self {
        Self {
            token: CancellationToken::new(),
            outcomes,
        }
    }

    /// Next kill attempt made by the relay
    ///
    /// Returns `None` once the listener has stopped.
    pub async fn next_outcome(&mut self) -> Option<KillOutcome> {
        self.outcomes.recv().await
    }
}

impl Drop for SignalRelay {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
