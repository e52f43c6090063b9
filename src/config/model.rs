//! Execution configuration model
//!
//! [`ExecutionConfig`] is what a single run is supervised with. It starts from
//! a default and is adjusted by an ordered list of [`RunOption`]s, later ones
//! winning. [`ConfigFile`] is the serde shape used by the layered loader.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Deadline applied when no override is given
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Resolved settings for one supervised run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Wall-clock time after which the child is killed
    pub deadline: Duration,
    /// Whether captured bytes are also written to the host's stdout/stderr
    pub mirror_output: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            mirror_output: true,
        }
    }
}

impl ExecutionConfig {
    /// Apply options in order on top of this config
    pub fn with_options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = RunOption>,
    {
        for option in options {
            option.apply(&mut self);
        }
        self
    }
}

/// A single override applied to an [`ExecutionConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOption {
    /// Keep capturing, but do not mirror to the host streams
    SuppressOutput,
    /// Replace the deadline. Zero is accepted and times out immediately.
    Deadline(Duration),
}

impl RunOption {
    pub fn apply(&self, config: &mut ExecutionConfig) {
        match *self {
            RunOption::SuppressOutput => config.mirror_output = false,
            RunOption::Deadline(deadline) => config.deadline = deadline,
        }
    }
}

/// Suppress live mirroring of the child's output
pub fn suppress_output() -> RunOption {
    RunOption::SuppressOutput
}

/// Override the default 30 second deadline
pub fn deadline(deadline: Duration) -> RunOption {
    RunOption::Deadline(deadline)
}

/// On-disk / environment representation of the defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Deadline in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Mirror child output to the host streams
    #[serde(default = "default_mirror_output")]
    pub mirror_output: bool,
}

fn default_deadline_ms() -> u64 {
    DEFAULT_DEADLINE.as_millis() as u64
}

fn default_mirror_output() -> bool {
    true
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            deadline_ms: default_deadline_ms(),
            mirror_output: default_mirror_output(),
        }
    }
}

impl From<ConfigFile> for ExecutionConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            deadline: Duration::from_millis(file.deadline_ms),
            mirror_output: file.mirror_output,
        }
    }
}
