//! Error types for childwatch
//!
//! Every failure of a supervised run is reported through [`RunError`]. The
//! contract is all-or-nothing: a run that fails never hands back the bytes it
//! captured before the failure was recognized.

use std::process::ExitStatus;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Which of the child's output streams an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamName::Stdout => f.write_str("stdout"),
            StreamName::Stderr => f.write_str("stderr"),
        }
    }
}

/// Main error type for supervised runs
#[derive(Error, Debug)]
pub enum RunError {
    /// The process could not be launched
    #[error("Failed to start command: {program}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Subscribing to host termination signals failed
    #[error("Failed to subscribe to termination signals")]
    SignalSetup(#[source] std::io::Error),

    /// Draining one of the output streams failed
    #[error("Failed to capture {stream}")]
    StreamCapture {
        stream: StreamName,
        #[source]
        source: std::io::Error,
    },

    /// Process exited with a non-success status
    #[error("Command exited with {status}")]
    Exit { status: ExitStatus },

    /// Process was killed because the host received a termination signal
    #[error("Command killed after host received {signal}")]
    Interrupted { signal: &'static str },

    /// Waiting on the process failed
    #[error("Failed to wait for command exit")]
    Wait(#[source] std::io::Error),

    /// The async runtime for a blocking run could not be built
    #[error("Failed to build async runtime")]
    Runtime(#[source] std::io::Error),

    /// A kill request did not terminate the process
    #[error("Failed to kill command")]
    Kill(#[source] std::io::Error),

    /// The deadline elapsed and the process was killed.
    ///
    /// Output captured up to that point is discarded.
    #[error("Command timed out after {}ms", .deadline.as_millis())]
    Timeout { deadline: Duration },
}

/// Error taxonomy, independent of the concrete failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    StartError,
    StreamCaptureError,
    ExitError,
    KillError,
    TimeoutError,
    Interrupted,
    WaitError,
    SignalSetupError,
    RuntimeError,
}

impl RunError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Start { .. } => ErrorKind::StartError,
            RunError::SignalSetup(_) => ErrorKind::SignalSetupError,
            RunError::StreamCapture { .. } => ErrorKind::StreamCaptureError,
            RunError::Exit { .. } => ErrorKind::ExitError,
            RunError::Interrupted { .. } => ErrorKind::Interrupted,
            RunError::Wait(_) => ErrorKind::WaitError,
            RunError::Runtime(_) => ErrorKind::RuntimeError,
            RunError::Kill(_) => ErrorKind::KillError,
            RunError::Timeout { .. } => ErrorKind::TimeoutError,
        }
    }

    /// Exit code of the child, when it exited on its own with one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::Exit { status } => status.code(),
            _ => None,
        }
    }
}

/// Serializable error info for machine-readable reports
#[derive(Debug, Serialize, Clone)]
pub struct ErrorInfo {
    pub message: String,
    pub error_type: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&RunError> for ErrorInfo {
    fn from(err: &RunError) -> Self {
        let cause = std::error::Error::source(err).map(|e| e.to_string());
        let suggestion = match err {
            RunError::Start { source, .. } => Some(suggest_start_fix(source)),
            RunError::Timeout { .. } => Some(
                "Try increasing the deadline or checking if the command hangs".to_string(),
            ),
            _ => None,
        };

        ErrorInfo {
            message: err.to_string(),
            error_type: err.kind(),
            cause,
            exit_code: err.exit_code(),
            suggestion,
        }
    }
}

/// Suggest a fix for a failed launch
fn suggest_start_fix(error: &std::io::Error) -> String {
    match error.kind() {
        std::io::ErrorKind::NotFound => {
            "Executable not found. Check the program name and PATH.".to_string()
        }
        std::io::ErrorKind::PermissionDenied => {
            "Permission denied. Check that the file is executable.".to_string()
        }
        _ => format!("Check if the command can be executed: {}", error),
    }
}
