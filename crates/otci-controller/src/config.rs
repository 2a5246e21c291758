//! Executor configuration and per-command invocation options.

use std::path::Path;
use std::time::Duration;

use otci_protocol::CommandLine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of re-issue attempts after a failed command.
pub const DEFAULT_RETRY_COUNT: u32 = 4;
/// Default command timeout, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: f64 = 10.0;
/// Default pause between attempts, in seconds.
pub const DEFAULT_RETRY_BACKOFF_SECS: f64 = 2.0;
/// Label attached to log records unless configured otherwise.
pub const DEFAULT_LOG_LABEL: &str = "otci";

/// Errors loading an [`ExecutorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for a command executor.
///
/// All durations are in transport seconds (virtual seconds on a simulated
/// transport).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// How many times a failed command is re-issued.
    pub retry_count: u32,
    /// Deadline for a command's terminal line.
    pub command_timeout_secs: f64,
    /// Pause between attempts.
    pub retry_backoff_secs: f64,
    /// How long output is collected after `reset`/`factoryreset`.
    pub reset_settle_secs: f64,
    /// Step used when polling in `wait` and `wait_for`.
    pub poll_interval_secs: f64,
    /// Label attached to log records; `None` (`log_label: null` in YAML)
    /// disables logging.
    pub log_label: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            retry_count: DEFAULT_RETRY_COUNT,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            retry_backoff_secs: DEFAULT_RETRY_BACKOFF_SECS,
            reset_settle_secs: 3.0,
            poll_interval_secs: 1.0,
            log_label: Some(DEFAULT_LOG_LABEL.to_string()),
        }
    }
}

impl ExecutorConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: ExecutorConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Check that every duration is finite and non-negative and the poll
    /// interval is positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("command_timeout_secs", self.command_timeout_secs),
            ("retry_backoff_secs", self.retry_backoff_secs),
            ("reset_settle_secs", self.reset_settle_secs),
            ("poll_interval_secs", self.poll_interval_secs),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number, got {value}")));
            }
        }
        if self.poll_interval_secs == 0.0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        secs(self.command_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        secs(self.retry_backoff_secs)
    }

    pub fn reset_settle(&self) -> Duration {
        secs(self.reset_settle_secs)
    }

    /// Poll step, never zero.
    pub fn poll_interval(&self) -> Duration {
        let step = secs(self.poll_interval_secs);
        if step.is_zero() {
            Duration::from_secs(1)
        } else {
            step
        }
    }
}

/// Convert seconds to a duration, clamping out-of-range values.
pub(crate) fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// Bounded re-issue policy for one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Re-issue attempts after the first one.
    pub max_attempts: u32,
    /// Transport time between attempts.
    pub backoff: Duration,
}

impl RetryBudget {
    /// Total number of sends allowed, first attempt included.
    pub fn total_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        RetryBudget {
            max_attempts: DEFAULT_RETRY_COUNT,
            backoff: secs(DEFAULT_RETRY_BACKOFF_SECS),
        }
    }
}

/// One command to execute, with its options.
///
/// ```rust
/// use otci_controller::CommandInvocation;
/// use std::time::Duration;
///
/// let inv = CommandInvocation::new("dns resolve host.example")
///     .timeout(Duration::from_secs(30))
///     .silent();
/// assert_eq!(inv.text(), "dns resolve host.example");
/// assert!(inv.is_silent());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    text: String,
    timeout: Option<Duration>,
    silent: bool,
    already_is_ok: bool,
    ignore_result: bool,
    retry_count: Option<u32>,
}

impl CommandInvocation {
    pub fn new(text: impl Into<String>) -> Self {
        CommandInvocation {
            text: text.into(),
            timeout: None,
            silent: false,
            already_is_ok: true,
            ignore_result: false,
            retry_count: None,
        }
    }

    /// Override the executor's command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Do not log the command or its output.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Whether `Error 24: Already` counts as success (default true).
    pub fn already_is_ok(mut self, ok: bool) -> Self {
        self.already_is_ok = ok;
        self
    }

    /// Return the raw output, terminal line included, without classifying it.
    pub fn ignore_result(mut self) -> Self {
        self.ignore_result = true;
        self
    }

    /// Override the executor's retry count for this command only.
    pub fn retries(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn is_already_ok(&self) -> bool {
        self.already_is_ok
    }

    pub fn is_ignore_result(&self) -> bool {
        self.ignore_result
    }

    pub fn retry_override(&self) -> Option<u32> {
        self.retry_count
    }
}

impl From<&str> for CommandInvocation {
    fn from(text: &str) -> Self {
        CommandInvocation::new(text)
    }
}

impl From<String> for CommandInvocation {
    fn from(text: String) -> Self {
        CommandInvocation::new(text)
    }
}

impl From<CommandLine> for CommandInvocation {
    fn from(line: CommandLine) -> Self {
        CommandInvocation::new(line.build())
    }
}
