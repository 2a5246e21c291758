//! Command executor.
//!
//! Sends one command at a time over a [`Transport`], collects output until a
//! terminal line, classifies the outcome and re-issues failed commands within
//! a bounded [`RetryBudget`]. All waiting happens in transport time, so the
//! same executor drives a real console and a virtual-time simulation.

use std::time::Duration;

use otci_protocol::{
    classify_output, is_error_line, is_exempt, is_terminal, LinePattern, OtciError, OtciResult,
};
use otci_transport::{Received, Transport};
use tracing::{debug, info, trace, warn};

use crate::config::{CommandInvocation, ExecutorConfig, RetryBudget};
use crate::telemetry::metric_defs;

/// Callback invoked with every raw line read from the device.
pub type LineCallback = Box<dyn FnMut(&str) + Send>;

/// Counters kept by an executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Sends attempted, retries included.
    pub commands_sent: u32,
    /// Invocations that returned output.
    pub commands_succeeded: u32,
    /// Invocations that surfaced an error.
    pub commands_failed: u32,
    /// Re-issues after a retryable failure.
    pub retries: u32,
}

// ============================================================================
// Executor
// ============================================================================

/// Runs commands against one device console.
pub struct Executor<T: Transport> {
    transport: T,
    config: ExecutorConfig,
    budget: RetryBudget,
    filter: Option<LinePattern>,
    line_callback: Option<LineCallback>,
    stats: ExecutorStats,
}

impl<T: Transport> Executor<T> {
    /// Create an executor with the default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ExecutorConfig::default())
    }

    /// Create an executor with the given configuration.
    pub fn with_config(transport: T, config: ExecutorConfig) -> Self {
        let budget = RetryBudget {
            max_attempts: config.retry_count,
            backoff: config.retry_backoff(),
        };
        Executor {
            transport,
            config,
            budget,
            filter: None,
            line_callback: None,
            stats: ExecutorStats::default(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn stats(&self) -> ExecutorStats {
        self.stats
    }

    pub fn retry_budget(&self) -> RetryBudget {
        self.budget
    }

    /// Set how many times a failed command is re-issued.
    pub fn set_retry_count(&mut self, count: u32) {
        self.budget.max_attempts = count;
        self.config.retry_count = count;
    }

    /// Set the label attached to log records, or `None` to stop logging.
    pub fn set_log_label(&mut self, label: Option<String>) {
        self.config.log_label = label;
    }

    pub fn log_label(&self) -> Option<&str> {
        self.config.log_label.as_deref()
    }

    /// Drop output lines matching `filter` (e.g. asynchronous log lines).
    pub fn set_filter(&mut self, filter: Option<LinePattern>) {
        self.filter = filter;
    }

    /// Call `callback` with every raw line read from the device.
    pub fn set_line_read_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.line_callback = Some(Box::new(callback));
    }

    pub fn clear_line_read_callback(&mut self) {
        self.line_callback = None;
    }

    /// Close the transport.
    pub fn close(&mut self) -> OtciResult<()> {
        self.transport.close()?;
        Ok(())
    }

    // ========================================================================
    // Command execution
    // ========================================================================

    /// Execute a command and return its payload lines.
    ///
    /// Retryable failures are re-issued after the backoff until the budget
    /// runs out; the last error is then returned unchanged.
    pub fn execute(&mut self, cmd: impl Into<CommandInvocation>) -> OtciResult<Vec<String>> {
        let inv = cmd.into();
        let max_attempts = inv.retry_override().unwrap_or(self.budget.max_attempts);
        let mut attempt = 0u32;

        loop {
            match self.execute_once(&inv) {
                Ok(output) => {
                    self.stats.commands_succeeded += 1;
                    self.count(metric_defs::COMMANDS_SUCCEEDED);
                    return Ok(output);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    attempt += 1;
                    self.stats.retries += 1;
                    self.count(metric_defs::RETRIES);
                    if let Some(label) = self.log_label() {
                        warn!(
                            "Otci[{}]: `{}` failed ({}), retry {}/{}",
                            label,
                            inv.text(),
                            e,
                            attempt,
                            max_attempts
                        );
                    }
                    // Backoff failures are left for the next attempt to surface.
                    let backoff = self.budget.backoff;
                    if let Err(backoff_err) = self.collect_for(backoff) {
                        if let Some(label) = self.log_label() {
                            warn!("Otci[{}]: backoff before retry {} failed: {}", label, attempt, backoff_err);
                        }
                    }
                }
                Err(e) => {
                    self.stats.commands_failed += 1;
                    self.count(metric_defs::COMMANDS_FAILED);
                    return Err(e);
                }
            }
        }
    }

    /// Execute a command once, without retrying.
    fn execute_once(&mut self, inv: &CommandInvocation) -> OtciResult<Vec<String>> {
        let cmd = inv.text();
        let silent = inv.is_silent();

        self.discard_stale()?;

        if !silent {
            if let Some(label) = self.log_label() {
                info!("Otci[{}]: > {}", label, cmd);
            }
        }

        self.stats.commands_sent += 1;
        self.count(metric_defs::COMMANDS_SENT);
        self.transport.send(cmd)?;

        if is_exempt(cmd) {
            let settle = self.config.reset_settle();
            let output = self.collect_for(settle)?;
            self.log_output(&output, silent);
            return Ok(output);
        }

        let timeout = inv.timeout_override().unwrap_or_else(|| self.config.command_timeout());
        let output = self.read_until_terminal(cmd, timeout)?;
        self.log_output(&output, silent);

        if inv.is_ignore_result() {
            return Ok(output);
        }
        classify_output(cmd, output, inv.is_already_ok())
    }

    /// Read lines until a terminal line arrives or `timeout` elapses.
    fn read_until_terminal(&mut self, cmd: &str, timeout: Duration) -> OtciResult<Vec<String>> {
        let deadline = self.transport.now() + timeout;
        let mut output = Vec::new();

        loop {
            let remaining = deadline.saturating_sub(self.transport.now());
            match self.transport.receive(remaining)? {
                Received::Line(line) => {
                    if let Some(line) = self.accept_line(line) {
                        let done = is_terminal(&line);
                        output.push(line);
                        if done {
                            return Ok(output);
                        }
                    }
                }
                Received::Timeout => {
                    return Err(OtciError::Timeout {
                        command: cmd.to_string(),
                        output,
                    });
                }
            }
        }
    }

    /// Check whether the device accepts `cmd`.
    ///
    /// The command is sent once, without retries; it is unsupported when the
    /// reply ends in an `Error <n>: ...` line.
    pub fn is_command_supported(&mut self, cmd: &str) -> OtciResult<bool> {
        let inv = CommandInvocation::new(cmd).ignore_result();
        let output = self.execute_once(&inv)?;
        Ok(!output.last().is_some_and(|line| is_error_line(line)))
    }

    // ========================================================================
    // Waiting
    // ========================================================================

    /// Let `duration` of transport time pass, collecting output.
    ///
    /// With `expect_line`, polls one interval at a time and returns as soon
    /// as a matching line has been seen; if none shows up within `duration`
    /// the result is [`OtciError::ExpectLineTimeout`].
    pub fn wait(&mut self, duration: Duration, expect_line: Option<&LinePattern>) -> OtciResult<Vec<String>> {
        if let Some(label) = self.log_label() {
            debug!("Otci[{}]: wait for {:.3} seconds", label, duration.as_secs_f64());
        }

        let Some(pattern) = expect_line else {
            return self.collect_for(duration);
        };

        let step = self.config.poll_interval();
        let mut remaining = duration;
        let mut output = Vec::new();

        while !remaining.is_zero() {
            let chunk = step.min(remaining);
            let lines = self.collect_for(chunk)?;
            remaining -= chunk;

            let matched = pattern.matches_any(&lines);
            output.extend(lines);
            if matched {
                return Ok(output);
            }
        }

        Err(OtciError::ExpectLineTimeout {
            pattern: pattern.to_string(),
        })
    }

    /// Re-run `cmd` once per poll interval until its payload contains a line
    /// matching `expect_line`.
    pub fn wait_for(&mut self, cmd: &str, expect_line: &LinePattern, timeout: Duration) -> OtciResult<Vec<String>> {
        let step = self.config.poll_interval();
        let mut remaining = timeout;

        while !remaining.is_zero() {
            let output = self.execute(cmd)?;
            if expect_line.matches_any(&output) {
                return Ok(output);
            }

            let chunk = step.min(remaining);
            self.collect_for(chunk)?;
            remaining -= chunk;
        }

        Err(OtciError::ExpectLineTimeout {
            pattern: expect_line.to_string(),
        })
    }

    // ========================================================================
    // Line plumbing
    // ========================================================================

    /// Advance the transport by `duration` and return every line that arrived.
    fn collect_for(&mut self, duration: Duration) -> OtciResult<Vec<String>> {
        self.transport.advance(duration)?;
        self.drain()
    }

    /// Read every line that is already available.
    fn drain(&mut self) -> OtciResult<Vec<String>> {
        let mut output = Vec::new();
        while let Received::Line(line) = self.transport.receive(Duration::ZERO)? {
            if let Some(line) = self.accept_line(line) {
                output.push(line);
            }
        }
        Ok(output)
    }

    /// Drop output left over from earlier commands.
    fn discard_stale(&mut self) -> OtciResult<()> {
        let stale = self.drain()?;
        if !stale.is_empty() {
            if let Some(label) = self.log_label() {
                trace!("Otci[{}]: discarding {} stale lines: {:?}", label, stale.len(), stale);
            }
        }
        Ok(())
    }

    /// Run the line callback, then apply the filter.
    fn accept_line(&mut self, line: String) -> Option<String> {
        if let Some(callback) = self.line_callback.as_mut() {
            callback(&line);
        }
        if self.filter.as_ref().is_some_and(|f| f.matches(&line)) {
            trace!("filtered line: {}", line);
            return None;
        }
        Some(line)
    }

    /// Bump a counter, labelled with this executor's device.
    fn count(&self, name: &'static str) {
        let labels = [("device", self.config.log_label.clone().unwrap_or_default())];
        metrics::counter!(name, &labels).increment(1);
    }

    fn log_output(&self, output: &[String], silent: bool) {
        if silent {
            return;
        }
        if let Some(label) = self.log_label() {
            for line in output {
                info!("Otci[{}]: {}", label, line);
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Executor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("budget", &self.budget)
            .field("filter", &self.filter)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::{Arc, Mutex};

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8_lossy(&capture.0.lock().unwrap()).into_owned();
        (result, text)
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::capture_logs;
    use super::*;
    use otci_transport::{Reply, ScriptedTransport};
    use std::sync::{Arc, Mutex};

    const SEC: Duration = Duration::from_secs(1);

    fn executor() -> Executor<ScriptedTransport> {
        Executor::new(ScriptedTransport::new())
    }

    #[test]
    fn test_done_stripped() {
        let mut ex = executor();
        ex.transport_mut().expect("channel", ["15", "Done"]);
        assert_eq!(ex.execute("channel").unwrap(), vec!["15".to_string()]);
        assert_eq!(ex.stats().commands_succeeded, 1);
    }

    #[test]
    fn test_already_is_ok_by_default() {
        let mut ex = executor();
        ex.transport_mut()
            .expect("ifconfig up", ["Error 24: Already"])
            .expect("ifconfig up", ["Error 24: Already"]);
        assert!(ex.execute("ifconfig up").unwrap().is_empty());

        ex.set_retry_count(0);
        let err = ex
            .execute(CommandInvocation::new("ifconfig up").already_is_ok(false))
            .unwrap_err();
        assert!(matches!(err, OtciError::Command(ref c) if c.code == Some(24)));
    }

    #[test]
    fn test_ignore_result_keeps_terminal_line() {
        let mut ex = executor();
        ex.transport_mut().expect("dns resolve x", ["Error 28: ResponseTimeout"]);
        let out = ex.execute(CommandInvocation::new("dns resolve x").ignore_result()).unwrap();
        assert_eq!(out, vec!["Error 28: ResponseTimeout".to_string()]);
    }

    #[test]
    fn test_reset_collects_without_terminal() {
        let mut ex = executor();
        ex.transport_mut().expect("reset", Reply::silence());
        assert!(ex.execute("reset").unwrap().is_empty());
        assert_eq!(ex.transport().now(), SEC * 3);
    }

    #[test]
    fn test_timeout_reports_partial_output() {
        let mut ex = executor();
        ex.set_retry_count(0);
        ex.transport_mut().expect("scan", ["| Ch |"]);
        let err = ex.execute(CommandInvocation::new("scan").timeout(SEC * 5)).unwrap_err();
        match err {
            OtciError::Timeout { command, output } => {
                assert_eq!(command, "scan");
                assert_eq!(output, vec!["| Ch |".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ex.transport().now(), SEC * 5);
    }

    #[test]
    fn test_backoff_between_attempts_only() {
        let mut ex = executor();
        ex.set_retry_count(2);
        ex.transport_mut()
            .expect("state", ["Error 13: InvalidState"])
            .expect("state", ["leader", "Done"]);
        assert_eq!(ex.execute("state").unwrap(), vec!["leader".to_string()]);
        assert_eq!(ex.transport().now(), SEC * 2);
        assert_eq!(ex.stats().retries, 1);
        assert_eq!(ex.stats().commands_sent, 2);
    }

    #[test]
    fn test_filter_and_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut ex = executor();
        ex.set_filter(Some(LinePattern::regex(r"\[(INFO|DEBG)\]").unwrap()));
        ex.set_line_read_callback(move |line| sink.lock().unwrap().push(line.to_string()));
        ex.transport_mut().expect("state", ["[INFO]-MLE-----: Role detached -> leader", "leader", "Done"]);

        assert_eq!(ex.execute("state").unwrap(), vec!["leader".to_string()]);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_is_command_supported() {
        let mut ex = executor();
        ex.transport_mut().expect("version api", ["521", "Done"]);
        assert!(ex.is_command_supported("version api").unwrap());
        assert!(!ex.is_command_supported("bogus").unwrap());
        assert_eq!(ex.transport().sent_count("bogus"), 1);
    }

    #[test]
    fn test_wait_returns_early() {
        let mut ex = executor();
        ex.transport_mut().emit_at(SEC * 3, "Done");
        let out = ex.wait(SEC * 5, Some(&LinePattern::from("Done"))).unwrap();
        assert_eq!(out, vec!["Done".to_string()]);
        assert_eq!(ex.transport().now(), SEC * 3);
    }

    #[test]
    fn test_wait_without_pattern_runs_full_duration() {
        let mut ex = executor();
        ex.transport_mut().emit_at(SEC, "hello");
        let out = ex.wait(SEC * 4, None).unwrap();
        assert_eq!(out, vec!["hello".to_string()]);
        assert_eq!(ex.transport().now(), SEC * 4);
    }

    #[test]
    fn test_log_label() {
        let mut ex = executor();
        assert_eq!(ex.log_label(), Some("otci"));
        ex.set_log_label(Some("leader".to_string()));
        assert_eq!(ex.log_label(), Some("leader"));
        ex.transport_mut().expect("state", ["leader", "Done"]);
        assert_eq!(ex.execute("state").unwrap(), vec!["leader".to_string()]);
    }

    #[test]
    fn test_commands_logged_unless_silent() {
        let mut ex = executor();
        ex.transport_mut().respond("state", ["leader", "Done"]);

        let (out, logs) = capture_logs(|| ex.execute("state").unwrap());
        assert_eq!(out, vec!["leader".to_string()]);
        assert!(logs.contains("Otci[otci]: > state"), "{logs}");
        assert!(logs.contains("Otci[otci]: leader"), "{logs}");

        let (silent_out, logs) = capture_logs(|| ex.execute(CommandInvocation::new("state").silent()).unwrap());
        assert_eq!(silent_out, out);
        assert!(!logs.contains("> state"), "{logs}");

        ex.set_log_label(None);
        let (quiet_out, logs) = capture_logs(|| ex.execute("state").unwrap());
        assert_eq!(quiet_out, out);
        assert!(!logs.contains("Otci["), "{logs}");
    }

    #[test]
    fn test_retry_logged_with_label() {
        let mut ex = executor();
        ex.set_log_label(Some("router".to_string()));
        ex.transport_mut()
            .expect("state", ["Error 1: Failed"])
            .respond("state", ["router", "Done"]);

        let (out, logs) = capture_logs(|| ex.execute("state").unwrap());
        assert_eq!(out, vec!["router".to_string()]);
        assert!(logs.contains("Otci[router]: `state` failed"), "{logs}");
    }
}
