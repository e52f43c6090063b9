//! Host signal relay inside the calling process
//!
//! Kept in its own test binary: it signals the test process itself, which
//! would interrupt runs in any other test sharing the process.

#![cfg(unix)]

use std::time::{Duration, Instant};

use childwatch::{deadline, run, suppress_output, ErrorKind, RunError};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

#[tokio::test]
async fn test_sigterm_interrupts_run_while_grandchild_holds_pipes() {
    tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        kill(Pid::this(), Signal::SIGTERM).expect("failed to signal self");
    });

    let start = Instant::now();
    let err = run(
        "sh",
        ["-c", "sleep 30 & wait"],
        [suppress_output(), deadline(Duration::from_secs(10))],
    )
    .await
    .unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err.kind(), ErrorKind::Interrupted);
    assert!(matches!(err, RunError::Interrupted { signal: "SIGTERM" }));
    assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
}
