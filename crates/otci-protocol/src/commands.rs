//! Building command lines for the device CLI.
//!
//! Commands are single ASCII lines. Arguments are separated by spaces, so
//! free text supplied by callers is escaped before it is placed on the line.

use crate::codec::LineCodec;
use crate::error::{OtciError, OtciResult};
use crate::records::TxtValue;

/// Commands whose reply carries no terminal line.
pub const EXEMPT_COMMANDS: [&str; 2] = ["reset", "factoryreset"];

/// Characters the CLI treats as argument separators or escapes.
const ESCAPABLE_CHARS: [char; 5] = ['\\', ' ', '\t', '\r', '\n'];

/// Maximum length of one encoded TXT entry (length-prefixed with one byte).
pub const MAX_TXT_ENTRY_LEN: usize = 255;

/// Check whether a command is exempt from terminal-line checking.
pub fn is_exempt(cmd: &str) -> bool {
    EXEMPT_COMMANDS.contains(&cmd)
}

/// Escape CLI-escapable characters so free text stays a single argument.
pub fn escape_escapable(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if ESCAPABLE_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Encode TXT entries into the hex form accepted by `srp client service add`.
///
/// Each entry is `key=value` (or a bare `key` for flags) prefixed with its
/// length byte.
pub fn txt_to_hex(entries: &[(String, TxtValue)]) -> OtciResult<String> {
    let mut txt_bin = Vec::new();
    for (key, value) in entries {
        if key.contains('=') {
            return Err(OtciError::InvalidArguments(format!("TXT key must not contain `=`: {key}")));
        }

        let mut entry = key.as_bytes().to_vec();
        if let TxtValue::Bytes(bytes) = value {
            entry.push(b'=');
            entry.extend_from_slice(bytes);
        }

        if entry.len() > MAX_TXT_ENTRY_LEN {
            return Err(OtciError::InvalidArguments(format!(
                "TXT entry `{key}` is too long: {} bytes",
                entry.len()
            )));
        }

        txt_bin.push(entry.len() as u8);
        txt_bin.extend_from_slice(&entry);
    }
    Ok(crate::hex::encode(&txt_bin))
}

/// A command line under construction.
///
/// ```rust
/// use otci_protocol::CommandLine;
///
/// let line = CommandLine::new("srp client host remove").flag(true, "1").build();
/// assert_eq!(line, "srp client host remove 1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    text: String,
}

impl CommandLine {
    /// Start a command line with its keyword(s).
    pub fn new(keyword: impl Into<String>) -> Self {
        CommandLine { text: keyword.into() }
    }

    /// Append an argument verbatim.
    pub fn arg(mut self, arg: impl std::fmt::Display) -> Self {
        self.text.push(' ');
        self.text.push_str(&arg.to_string());
        self
    }

    /// Append a free-text argument, escaped.
    pub fn text_arg(self, text: &str) -> Self {
        let escaped = escape_escapable(text);
        self.arg(escaped)
    }

    /// Append an escaped free-text argument only when present.
    pub fn opt_text_arg(self, text: Option<&str>) -> Self {
        match text {
            Some(t) => self.text_arg(t),
            None => self,
        }
    }

    /// Append an argument only when present.
    pub fn opt_arg<T: std::fmt::Display>(self, arg: Option<T>) -> Self {
        match arg {
            Some(a) => self.arg(a),
            None => self,
        }
    }

    /// Append `word` only when `enabled` is true.
    pub fn flag(self, enabled: bool, word: &str) -> Self {
        if enabled {
            self.arg(word)
        } else {
            self
        }
    }

    /// Finish the command line.
    pub fn build(self) -> String {
        self.text
    }

    /// Encode the command line for transmission.
    pub fn encode(&self) -> Vec<u8> {
        LineCodec::encode_command(&self.text)
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<CommandLine> for String {
    fn from(line: CommandLine) -> Self {
        line.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exempt_commands() {
        assert!(is_exempt("reset"));
        assert!(is_exempt("factoryreset"));
        assert!(!is_exempt("reset bootloader"));
        assert!(!is_exempt("state"));
    }

    #[test]
    fn test_escape_escapable() {
        assert_eq!(escape_escapable("My Network"), "My\\ Network");
        assert_eq!(escape_escapable("a\\b"), "a\\\\b");
        assert_eq!(escape_escapable("tab\there"), "tab\\\there");
        assert_eq!(escape_escapable("plain"), "plain");
    }

    #[test]
    fn test_command_line_builder() {
        let line = CommandLine::new("networkname").text_arg("Open Thread").build();
        assert_eq!(line, "networkname Open\\ Thread");

        let line = CommandLine::new("macfilter addr add")
            .arg("dead00beef00cafe")
            .opt_arg(None::<i8>)
            .build();
        assert_eq!(line, "macfilter addr add dead00beef00cafe");

        let cmd = CommandLine::new("channel").arg(15);
        assert_eq!(cmd.encode(), b"channel 15\r");
    }

    #[test]
    fn test_opt_text_arg() {
        let line = CommandLine::new("joiner start").text_arg("PSK D").opt_text_arg(Some("a b")).build();
        assert_eq!(line, r"joiner start PSK\ D a\ b");
        let line = CommandLine::new("joiner start").text_arg("PSKD").opt_text_arg(None).build();
        assert_eq!(line, "joiner start PSKD");
    }

    #[test]
    fn test_txt_to_hex() {
        let entries = vec![
            ("a".to_string(), TxtValue::Bytes(b"1".to_vec())),
            ("flag".to_string(), TxtValue::Flag),
        ];
        // 03 'a' '=' '1'  04 'f' 'l' 'a' 'g'
        assert_eq!(txt_to_hex(&entries).unwrap(), "03613d3104666c6167");
    }

    #[test]
    fn test_txt_key_with_equals_rejected() {
        let entries = vec![("a=b".to_string(), TxtValue::Flag)];
        assert!(matches!(txt_to_hex(&entries), Err(OtciError::InvalidArguments(_))));
    }

    #[test]
    fn test_txt_entry_too_long_rejected() {
        let entries = vec![("k".to_string(), TxtValue::Bytes(vec![0u8; 254]))];
        assert!(matches!(txt_to_hex(&entries), Err(OtciError::InvalidArguments(_))));
    }
}
