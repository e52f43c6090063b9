//! CLI definition using clap
//!
//! A thin harness around [`crate::run_with_config`]: run one command under
//! supervision and report the outcome.

use std::time::Duration;

use clap::Parser;

use crate::config::{deadline, suppress_output, RunOption};
use crate::error::RunError;

/// Run a command with output capture, a deadline and signal relay.
///
/// Output is mirrored live unless `--quiet` is given, in which case the
/// captured output is printed only after the command succeeds.
#[derive(Parser, Debug)]
#[command(name = "childwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long, env = "CHILDWATCH_CONFIG")]
    pub config: Option<String>,

    /// Do not mirror output while the command runs
    #[arg(short, long)]
    pub quiet: bool,

    /// Deadline in milliseconds
    #[arg(short = 't', long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Report failures as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Program to execute followed by its arguments
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "PROGRAM"
    )]
    pub command: Vec<String>,
}

impl Cli {
    /// Program to execute
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments passed to the program
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Overrides requested on the command line, in application order
    pub fn run_options(&self) -> Vec<RunOption> {
        let mut options = Vec::new();
        if self.quiet {
            options.push(suppress_output());
        }
        if let Some(ms) = self.timeout_ms {
            options.push(deadline(Duration::from_millis(ms)));
        }
        options
    }
}

/// Process exit code reported for a failed run
///
/// Follows shell conventions: the child's own code when it exited, 124 for a
/// timeout (as `timeout(1)`), 127 when the program could not be started and
/// 128 + signal number when the host was interrupted.
pub fn exit_code_for(err: &RunError) -> u8 {
    match err {
        RunError::Exit { status } => match status.code() {
            Some(code) if (1..=255).contains(&code) => code as u8,
            _ => 1,
        },
        RunError::Timeout { .. } => 124,
        RunError::Start { .. } => 127,
        RunError::Interrupted { signal } => match *signal {
            "SIGHUP" => 129,
            "SIGINT" | "CTRL_C" | "CTRL_BREAK" => 130,
            "SIGABRT" => 134,
            "SIGTERM" => 143,
            _ => 1,
        },
        _ => 1,
    }
}
