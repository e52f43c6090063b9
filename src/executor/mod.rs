//! Command execution module
//!
//! Provides supervised command execution with:
//! - A wall-clock deadline
//! - Concurrent stdout/stderr capture with optional live mirroring
//! - Relay of host termination signals to the child
//! - Idempotent forceful kill

pub mod capture;
pub mod process;
pub mod runner;
pub mod signal;

pub use capture::{drain_stream, OutputCapture, StreamCapture};
pub use process::{ExitEvent, KillReason, ProcessHandle};
pub use runner::*;
pub use signal::{HostSignals, KillOutcome, SignalRelay};

/// Whether a process with `pid` still exists
#[cfg(all(test, unix))]
pub(crate) fn pid_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid), None).is_ok()
}
