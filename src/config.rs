#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bon::Builder;

use crate::rubric::CapabilityFlag;

/// Default deadline for `command` checks and build/test invocations.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// Default deadline for `clang-format` invocations.
pub const DEFAULT_FORMAT_TIMEOUT_SECS: u64 = 60;

/// Extra time a `time_budget` command gets past its budget before it is
/// killed.
pub const DEFAULT_BUDGET_GRACE_SECS: u64 = 5;

/// Capability switches an operator enables for a run. Both default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Allow checks that need real hardware counters or devices.
    pub hardware: bool,
    /// Allow checks that need a CUDA accelerator.
    pub cuda:     bool,
}

impl Capabilities {
    /// Whether `flag` is enabled for this run.
    pub fn enabled(&self, flag: CapabilityFlag) -> bool {
        match flag {
            CapabilityFlag::Hardware => self.hardware,
            CapabilityFlag::Cuda => self.cuda,
        }
    }
}

/// Configuration for one grading invocation.
#[derive(Debug, Clone, Builder)]
#[builder(on(PathBuf, into))]
pub struct GraderConfig {
    /// Directory that contains `modules/`. External commands run here.
    #[builder(default = PathBuf::from("."))]
    root_dir:        PathBuf,
    /// Enabled capability flags.
    #[builder(default)]
    capabilities:    Capabilities,
    /// Deadline for build, test and `command` invocations.
    #[builder(default = Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS))]
    command_timeout: Duration,
    /// Deadline for `clang-format` invocations.
    #[builder(default = Duration::from_secs(DEFAULT_FORMAT_TIMEOUT_SECS))]
    format_timeout:  Duration,
    /// Grace period past a `time_budget` before the command is killed.
    #[builder(default = Duration::from_secs(DEFAULT_BUDGET_GRACE_SECS))]
    budget_grace:    Duration,
    /// Number of modules graded concurrently.
    #[builder(default = 1)]
    jobs:            usize,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GraderConfig {
    /// Applies `MODGRADE_*` environment overrides on top of this
    /// configuration.
    pub fn with_env_overrides(mut self) -> Self {
        self.command_timeout =
            read_timeout_secs("MODGRADE_COMMAND_TIMEOUT_SECS", self.command_timeout);
        self.format_timeout = read_timeout_secs("MODGRADE_FORMAT_TIMEOUT_SECS", self.format_timeout);
        self.budget_grace = read_timeout_secs("MODGRADE_BUDGET_GRACE_SECS", self.budget_grace);
        self
    }

    /// Returns the grading root.
    pub fn root_dir(&self) -> &Path {
        self.root_dir.as_path()
    }

    /// Returns the enabled capability flags.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Returns the deadline for build, test and `command` invocations.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Returns the deadline for `clang-format` invocations.
    pub fn format_timeout(&self) -> Duration {
        self.format_timeout
    }

    /// Returns the grace period granted past a `time_budget`.
    pub fn budget_grace(&self) -> Duration {
        self.budget_grace
    }

    /// Returns how many modules may be graded at once (at least one).
    pub fn jobs(&self) -> usize {
        self.jobs.max(1)
    }
}

/// Parses an environment variable holding whole seconds, falling back to
/// `default` when parsing fails or the variable is missing.
fn read_timeout_secs(env: &str, default: Duration) -> Duration {
    std::env::var(env)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
