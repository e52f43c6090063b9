//! Common test utilities for childwatch CLI tests

#![allow(dead_code)]

use std::path::Path;
use std::process::{Child, ExitStatus};
use std::time::{Duration, Instant};

use assert_cmd::Command;
#[cfg(unix)]
pub use nix::sys::signal::Signal;
#[cfg(unix)]
use nix::{sys::signal::kill, unistd::Pid};

/// The `childwatch` binary with a clean configuration environment
pub fn childwatch() -> Command {
    let mut cmd = Command::cargo_bin("childwatch").expect("childwatch binary not built");
    cmd.env_remove("CHILDWATCH_DEADLINE_MS")
        .env_remove("CHILDWATCH_MIRROR_OUTPUT")
        .env_remove("CHILDWATCH_CONFIG");
    cmd
}

/// The `childwatch` binary as a plain std command, for spawning in the background
pub fn childwatch_std() -> std::process::Command {
    use assert_cmd::cargo::CommandCargoExt;

    let mut cmd =
        std::process::Command::cargo_bin("childwatch").expect("childwatch binary not built");
    cmd.env_remove("CHILDWATCH_DEADLINE_MS")
        .env_remove("CHILDWATCH_MIRROR_OUTPUT")
        .env_remove("CHILDWATCH_CONFIG");
    cmd
}

/// Shell script that records its pid in `pid_file` and then sleeps
pub fn pid_then_sleep(pid_file: &Path, secs: u32) -> String {
    format!("echo $$ > '{}'; exec sleep {}", pid_file.display(), secs)
}

/// Wait until `pid_file` holds a complete pid
pub fn wait_for_pid(pid_file: &Path, timeout: Duration) -> i32 {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(content) = std::fs::read_to_string(pid_file) {
            if content.ends_with('\n') {
                return content.trim().parse().expect("pid file is not a number");
            }
        }
        assert!(Instant::now() < deadline, "pid file never written");
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Wait for a background process, failing the test if it does not exit in time
pub fn wait_with_timeout(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().expect("failed to poll child") {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("process did not exit within {:?}", timeout);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Whether a process with `pid` still exists
#[cfg(unix)]
pub fn pid_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Poll until `pid` is gone
#[cfg(unix)]
pub fn wait_until_gone(pid: i32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !pid_alive(pid) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    !pid_alive(pid)
}

/// Send `signal` to `pid`
#[cfg(unix)]
pub fn send_signal(pid: u32, signal: Signal) {
    kill(Pid::from_raw(pid as i32), signal)
        .unwrap_or_else(|e| panic!("failed to signal {}: {}", pid, e));
}
