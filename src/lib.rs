//! childwatch - supervised child process execution
//!
//! Runs an external command and hands back its captured stdout and stderr:
//! - **Mirroring** - output can be copied live to the host's own streams
//! - **Deadline** - the command is killed once a wall-clock limit elapses
//! - **Signal relay** - SIGINT/SIGTERM/SIGABRT/SIGHUP sent to the host kill the child
//!
//! Results are all-or-nothing: a failed run never returns partial output.
//!
//! ```no_run
//! use std::time::Duration;
//! use childwatch::{deadline, run, suppress_output};
//!
//! # async fn example() -> Result<(), childwatch::RunError> {
//! let output = run("ls", ["-la"], [suppress_output(), deadline(Duration::from_secs(5))]).await?;
//! println!("{}", String::from_utf8_lossy(&output.stdout));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;

pub use cli::Cli;
pub use config::{deadline, load_config, suppress_output, ExecutionConfig, RunOption};
pub use error::{ErrorInfo, ErrorKind, RunError, StreamName};
pub use executor::{run, run_blocking, run_with_config, RunOutput};
