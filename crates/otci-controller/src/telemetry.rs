//! Executor counters, emitted through the `metrics` facade.
//!
//! Every executor also keeps the same counts in its own [`ExecutorStats`],
//! so a caller can inspect one connection without installing a recorder.
//! Records carry a `device` label set to the executor's log label.
//!
//! [`ExecutorStats`]: crate::ExecutorStats

use metrics::describe_counter;

/// Metric names and descriptions.
pub mod metric_defs {
    /// Sends attempted, retries included.
    pub const COMMANDS_SENT: &str = "otci.commands_sent";
    /// Invocations that returned output.
    pub const COMMANDS_SUCCEEDED: &str = "otci.commands_succeeded";
    /// Invocations that surfaced an error.
    pub const COMMANDS_FAILED: &str = "otci.commands_failed";
    /// Re-issues after a retryable failure.
    pub const RETRIES: &str = "otci.retries";

    /// Every counter with its description.
    pub const ALL: [(&str, &str); 4] = [
        (COMMANDS_SENT, "Commands written to the device, retries included"),
        (COMMANDS_SUCCEEDED, "Command invocations that completed successfully"),
        (COMMANDS_FAILED, "Command invocations that surfaced an error"),
        (RETRIES, "Commands re-issued after a retryable failure"),
    ];
}

/// Register descriptions for every executor counter.
///
/// Call once after installing a metrics recorder.
pub fn describe_metrics() {
    for (name, description) in metric_defs::ALL {
        describe_counter!(name, description);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(names.iter().all(|name| name.starts_with("otci.")));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
