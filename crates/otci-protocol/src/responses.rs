//! Terminal-line classification.
//!
//! Every non-exempt command reply ends with exactly one terminal line:
//! - `Done` on success
//! - `Error <code>: <message>` on failure
//!
//! Everything before the terminal line is payload.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{CommandError, OtciResult};

/// Success marker.
pub const DONE: &str = "Done";

/// The failure line that means "already in the requested state".
pub const ALREADY: &str = "Error 24: Already";

/// Error code carried by [`ALREADY`].
pub const ERROR_CODE_ALREADY: u32 = 24;

fn error_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^Error (\d+): (.*)$").expect("static regex"))
}

/// A parsed terminal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// `Done`.
    Done,
    /// `Error <code>: <message>`.
    Error {
        /// Numeric error code.
        code: u32,
        /// Error message text.
        message: String,
    },
}

impl Terminal {
    /// Parse a line as a terminal marker.
    ///
    /// Returns `None` for payload lines.
    pub fn parse(line: &str) -> Option<Terminal> {
        if line == DONE {
            return Some(Terminal::Done);
        }

        let caps = error_line_pattern().captures(line)?;
        let code = caps[1].parse().ok()?;
        Some(Terminal::Error {
            code,
            message: caps[2].to_string(),
        })
    }

    /// Check if this is the success marker.
    pub fn is_done(&self) -> bool {
        matches!(self, Terminal::Done)
    }

    /// Check if this is the "already in requested state" failure.
    pub fn is_already(&self) -> bool {
        matches!(self, Terminal::Error { code, message } if *code == ERROR_CODE_ALREADY && message == "Already")
    }
}

/// Check whether a line ends a command reply.
pub fn is_terminal(line: &str) -> bool {
    Terminal::parse(line).is_some()
}

/// Check whether a line is a failure terminal line (`Error <n>: ...`).
pub fn is_error_line(line: &str) -> bool {
    matches!(Terminal::parse(line), Some(Terminal::Error { .. }))
}

/// Classify the collected output of one command.
///
/// On success the terminal line is stripped and the payload returned. When
/// `already_is_ok` is set, `Error 24: Already` counts as success too. Any
/// other last line (including none at all) is a [`CommandError`].
pub fn classify_output(command: &str, mut output: Vec<String>, already_is_ok: bool) -> OtciResult<Vec<String>> {
    let accepted = match output.last().and_then(|line| Terminal::parse(line)) {
        Some(terminal) => terminal.is_done() || (already_is_ok && terminal.is_already()),
        None => false,
    };

    if accepted {
        output.pop();
        Ok(output)
    } else {
        Err(CommandError::from_output(command, output).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OtciError;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_done() {
        assert_eq!(Terminal::parse("Done"), Some(Terminal::Done));
        assert!(Terminal::parse(" Done").is_none());
        assert!(Terminal::parse("Done!").is_none());
    }

    #[test]
    fn test_parse_error() {
        assert_eq!(
            Terminal::parse("Error 1: Failed"),
            Some(Terminal::Error { code: 1, message: "Failed".to_string() })
        );
        assert!(Terminal::parse("Error: nope").is_none());
        assert!(Terminal::parse(ALREADY).is_some_and(|t| t.is_already()));
    }

    #[test]
    fn test_classify_strips_done() {
        let payload = classify_output("channel", lines(&["15", "Done"]), false).unwrap();
        assert_eq!(payload, lines(&["15"]));
    }

    #[test]
    fn test_classify_empty_payload() {
        let payload = classify_output("channel 15", lines(&["Done"]), false).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_classify_already() {
        let payload = classify_output("ipmaddr add ff04::1", lines(&[ALREADY]), true).unwrap();
        assert!(payload.is_empty());

        let err = classify_output("ipmaddr add ff04::1", lines(&[ALREADY]), false).unwrap_err();
        assert!(matches!(err, OtciError::Command(ref e) if e.code == Some(24)));
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_output("channel 15", lines(&["Error 1: Failed"]), false).unwrap_err();
        match err {
            OtciError::Command(e) => {
                assert_eq!(e.command, "channel 15");
                assert_eq!(e.code, Some(1));
                assert_eq!(e.message, "Failed");
                assert_eq!(e.output, lines(&["Error 1: Failed"]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_missing_terminal() {
        let err = classify_output("state", lines(&["leader"]), true).unwrap_err();
        assert!(matches!(err, OtciError::Command(ref e) if e.code.is_none()));
    }
}
