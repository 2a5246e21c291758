//! Line-based codec for CLI communication.
//!
//! The device console is a plain text stream: commands are terminated with a
//! carriage return (`\r`), output arrives as `\r\n`-terminated lines, typed
//! characters are echoed back and an interactive prompt (`> `) may precede
//! the echo.

use bytes::BytesMut;

use crate::error::{TransportError, TransportResult};

/// Maximum accepted output line length.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Interactive prompt printed by the console before reading a command.
pub const PROMPT: &str = "> ";

/// A codec for reading and writing CLI lines.
///
/// This handles the line-based nature of the console:
/// - Accumulates received bytes until a complete line is found
/// - Filters the echo of the last command sent
/// - Strips the interactive prompt from the start of lines
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Whether we're currently receiving echo characters.
    in_echo: bool,
    /// The last command sent (for echo filtering).
    last_command: Option<String>,
    /// Position in the last command for echo matching.
    echo_pos: usize,
    /// Position in the prompt preceding the echo.
    prompt_pos: usize,
    /// Prompt to strip from the start of decoded lines.
    prompt: Option<&'static str>,
}

impl LineCodec {
    /// Create a new line codec that strips the default prompt.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH),
            in_echo: false,
            last_command: None,
            echo_pos: 0,
            prompt_pos: 0,
            prompt: Some(PROMPT),
        }
    }

    /// Create a codec that leaves line starts untouched.
    pub fn without_prompt() -> Self {
        LineCodec {
            prompt: None,
            ..LineCodec::new()
        }
    }

    /// Set the last command sent (used for echo filtering).
    pub fn set_last_command(&mut self, cmd: &str) {
        self.last_command = Some(cmd.to_string());
        self.echo_pos = 0;
        self.prompt_pos = 0;
        self.in_echo = true;
    }

    /// Clear the echo tracking state.
    pub fn clear_echo(&mut self) {
        self.last_command = None;
        self.echo_pos = 0;
        self.prompt_pos = 0;
        self.in_echo = false;
    }

    /// Add received data to the buffer, dropping echoed command characters.
    pub fn push(&mut self, data: &[u8]) {
        for &byte in data {
            if self.in_echo && self.consume_echo(byte) {
                continue;
            }
            self.buffer.extend_from_slice(&[byte]);
        }
    }

    /// Returns true if `byte` belongs to the echo and must be skipped.
    fn consume_echo(&mut self, byte: u8) -> bool {
        let Some(cmd) = self.last_command.as_deref() else {
            self.in_echo = false;
            return false;
        };
        let cmd_bytes = cmd.as_bytes();

        // The prompt may be printed ahead of the echo
        if self.echo_pos == 0 {
            if let Some(prompt) = self.prompt.map(str::as_bytes) {
                if self.prompt_pos < prompt.len() && byte == prompt[self.prompt_pos] {
                    self.prompt_pos += 1;
                    return true;
                }
            }
        }

        if self.echo_pos < cmd_bytes.len() && byte == cmd_bytes[self.echo_pos] {
            self.echo_pos += 1;
            return true;
        }
        if self.echo_pos == cmd_bytes.len() && byte == b'\r' {
            self.echo_pos += 1;
            return true;
        }
        if self.echo_pos == cmd_bytes.len() + 1 && byte == b'\n' {
            self.in_echo = false;
            return true;
        }

        // Not an echo character, stop echo mode
        self.in_echo = false;
        false
    }

    /// Add received data without echo filtering.
    pub fn push_raw(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Fail if the buffer holds more than a line's worth of unterminated data.
    pub fn check_overflow(&self) -> TransportResult<()> {
        if self.buffer.len() > MAX_LINE_LENGTH && !self.buffer.iter().any(|&b| b == b'\r' || b == b'\n') {
            return Err(TransportError::BufferOverflow {
                max: MAX_LINE_LENGTH,
                actual: self.buffer.len(),
            });
        }
        Ok(())
    }

    /// Try to decode a complete line from the buffer.
    ///
    /// Empty lines and bare prompts are skipped. Returns `None` if more data
    /// is needed.
    pub fn decode_line(&mut self) -> Option<String> {
        loop {
            let end = self.buffer.iter().position(|&b| b == b'\r' || b == b'\n')?;

            let line_data = self.buffer.split_to(end);
            let mut line = String::from_utf8_lossy(&line_data).to_string();

            // Skip the newline character(s)
            let skip = self.buffer.iter().take_while(|&&b| b == b'\r' || b == b'\n').count();
            let _ = self.buffer.split_to(skip);

            if let Some(prompt) = self.prompt {
                if let Some(rest) = line.strip_prefix(prompt) {
                    line = rest.to_string();
                } else if line == prompt.trim_end() {
                    line.clear();
                }
            }

            if line.is_empty() {
                log::trace!("LineCodec: skipping empty line");
                continue;
            }

            return Some(line);
        }
    }

    /// Encode a command for transmission.
    ///
    /// Appends the carriage return terminator.
    pub fn encode_command(cmd: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(cmd.len() + 1);
        buf.extend_from_slice(cmd.as_bytes());
        buf.push(b'\r');
        buf
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.clear_echo();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        assert_eq!(LineCodec::encode_command("state"), b"state\r");
    }

    #[test]
    fn test_decode_line() {
        let mut codec = LineCodec::new();
        codec.push_raw(b"leader\r\nDone\r\n");

        assert_eq!(codec.decode_line(), Some("leader".to_string()));
        assert_eq!(codec.decode_line(), Some("Done".to_string()));
        assert!(codec.decode_line().is_none());
    }

    #[test]
    fn test_partial_line() {
        let mut codec = LineCodec::new();
        codec.push_raw(b"Do");
        assert!(codec.decode_line().is_none());

        codec.push_raw(b"ne\r\n");
        assert_eq!(codec.decode_line(), Some("Done".to_string()));
    }

    #[test]
    fn test_echo_is_filtered() {
        let mut codec = LineCodec::new();
        codec.set_last_command("channel");
        codec.push(b"channel\r\n15\r\nDone\r\n");

        assert_eq!(codec.decode_line(), Some("15".to_string()));
        assert_eq!(codec.decode_line(), Some("Done".to_string()));
    }

    #[test]
    fn test_prompt_and_echo_are_filtered() {
        let mut codec = LineCodec::new();
        codec.set_last_command("state");
        codec.push(b"> state\r\nleader\r\nDone\r\n> ");

        assert_eq!(codec.decode_line(), Some("leader".to_string()));
        assert_eq!(codec.decode_line(), Some("Done".to_string()));
        assert!(codec.decode_line().is_none());
    }

    #[test]
    fn test_without_prompt_keeps_prefix() {
        let mut codec = LineCodec::without_prompt();
        codec.push_raw(b"> raw\r\n");
        assert_eq!(codec.decode_line(), Some("> raw".to_string()));
    }

    #[test]
    fn test_overflow_detected() {
        let mut codec = LineCodec::new();
        codec.push_raw(&vec![b'a'; MAX_LINE_LENGTH + 1]);
        assert!(matches!(
            codec.check_overflow(),
            Err(TransportError::BufferOverflow { max: MAX_LINE_LENGTH, .. })
        ));
    }
}
