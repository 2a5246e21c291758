//! Error types for the CLI protocol.

use std::fmt;

use thiserror::Error;

/// Errors raised by a transport while moving lines to or from the device.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error on the underlying byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection.
    #[error("connection closed by device")]
    Disconnected,

    /// The transport was used after `close()`.
    #[error("transport is closed")]
    Closed,

    /// Buffer overflow (line longer than the codec accepts).
    #[error("buffer overflow: max {max} bytes, got {actual}")]
    BufferOverflow { max: usize, actual: usize },
}

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// The device answered a command with a non-success terminal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    /// The command text that was sent.
    pub command: String,
    /// The complete output, terminal line included.
    pub output: Vec<String>,
    /// Numeric error code from an `Error <n>: <msg>` line, if the line had that shape.
    pub code: Option<u32>,
    /// Error message, or the raw last line when it was not an `Error` line.
    pub message: String,
}

impl CommandError {
    /// Build a command error from the full output of a failed command.
    pub fn from_output(command: &str, output: Vec<String>) -> Self {
        let last = output.last().map(String::as_str).unwrap_or_default();
        let (code, message) = match crate::responses::Terminal::parse(last) {
            Some(crate::responses::Terminal::Error { code, message }) => (Some(code), message),
            _ => (None, last.to_string()),
        };
        CommandError {
            command: command.to_string(),
            output,
            code,
            message,
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "command `{}` failed: Error {}: {}", self.command, code, self.message),
            None => write!(f, "command `{}` failed: {}", self.command, self.message),
        }
    }
}

impl std::error::Error for CommandError {}

/// Errors surfaced by the command engine and the structured decoders.
#[derive(Debug, Error)]
pub enum OtciError {
    /// Contradictory or out-of-range arguments, detected before any I/O.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The device reported a failure terminal line.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Successful output that a decoder could not make sense of.
    #[error("unexpected command output ({reason}): {output:?}")]
    UnexpectedOutput {
        /// The offending output lines.
        output: Vec<String>,
        /// What the decoder expected.
        reason: String,
    },

    /// A polled line did not show up in time.
    #[error("expected line {pattern} not seen before timeout")]
    ExpectLineTimeout {
        /// Description of the pattern that was awaited.
        pattern: String,
    },

    /// No terminal line arrived before the command deadline.
    #[error("timeout waiting for `{command}` to complete (got {} lines)", .output.len())]
    Timeout {
        /// The command text that was sent.
        command: String,
        /// Lines collected before the deadline.
        output: Vec<String>,
    },

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl OtciError {
    /// Build an `UnexpectedOutput` error from a slice of lines.
    pub fn unexpected<S: AsRef<str>>(output: &[S], reason: impl Into<String>) -> Self {
        OtciError::UnexpectedOutput {
            output: output.iter().map(|s| s.as_ref().to_string()).collect(),
            reason: reason.into(),
        }
    }

    /// Whether the executor may resend the command after this error.
    ///
    /// Only device failures, missed deadlines and transport faults qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OtciError::Command(_) | OtciError::Timeout { .. } | OtciError::Transport(_)
        )
    }
}

/// Result type alias for CLI operations.
pub type OtciResult<T> = Result<T, OtciError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_parses_code() {
        let err = CommandError::from_output("channel 99", vec!["Error 7: InvalidArgs".to_string()]);
        assert_eq!(err.code, Some(7));
        assert_eq!(err.message, "InvalidArgs");
        assert_eq!(err.to_string(), "command `channel 99` failed: Error 7: InvalidArgs");
    }

    #[test]
    fn test_command_error_without_error_line() {
        let err = CommandError::from_output("state", vec!["garbage".to_string()]);
        assert_eq!(err.code, None);
        assert_eq!(err.message, "garbage");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(OtciError::Transport(TransportError::Disconnected).is_retryable());
        assert!(OtciError::Timeout { command: "x".into(), output: vec![] }.is_retryable());
        assert!(!OtciError::InvalidArguments("both".into()).is_retryable());
        assert!(!OtciError::unexpected(&["a", "b"], "one line").is_retryable());
        assert!(!OtciError::ExpectLineTimeout { pattern: "Done".into() }.is_retryable());
    }
}
