//! Session configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default detach sequence: `~.` at the start of a line.
pub const DEFAULT_ESCAPE: &str = "\r~.";

/// Default depth of the inbound and outbound frame queues.
const DEFAULT_QUEUE: usize = 64;

/// Tuning for an attach session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachConfig {
    /// Detach sequence. Empty disables detaching.
    pub escape: String,
    /// Terminal type override for the pty request.
    pub term: Option<String>,
    /// Display name for status lines. Defaults to the target id.
    pub label: Option<String>,
    /// Inbound frame queue depth.
    pub inbound_queue: usize,
    /// Outbound frame queue depth.
    pub outbound_queue: usize,
}

impl Default for AttachConfig {
    fn default() -> Self {
        Self {
            escape: DEFAULT_ESCAPE.to_string(),
            term: None,
            label: None,
            inbound_queue: DEFAULT_QUEUE,
            outbound_queue: DEFAULT_QUEUE,
        }
    }
}

impl AttachConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Set the detach sequence.
    #[must_use]
    pub fn with_escape(mut self, escape: impl Into<String>) -> Self {
        self.escape = escape.into();
        self
    }

    /// Disable detaching.
    #[must_use]
    pub fn without_escape(mut self) -> Self {
        self.escape.clear();
        self
    }

    /// Set the status label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Override the terminal type.
    #[must_use]
    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    /// Detach sequence as bytes.
    #[must_use]
    pub fn escape_bytes(&self) -> &[u8] {
        self.escape.as_bytes()
    }
}

/// Parse a user-typed escape notation.
///
/// Understands `\r`, `\n`, `\t`, `\\`, `\xHH` (ASCII only) and caret
/// notation such as `^]`.
///
/// # Errors
/// Returns error on an unknown or truncated escape.
pub fn parse_escape(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('x') => {
                    let hex: String = chars.by_ref().take(2).collect();
                    let byte = u8::from_str_radix(&hex, 16)
                        .ok()
                        .filter(|b| b.is_ascii() && hex.len() == 2)
                        .ok_or_else(|| ConfigError::Escape(format!("\\x{hex}")))?;
                    out.push(char::from(byte));
                }
                Some(other) => return Err(ConfigError::Escape(format!("\\{other}"))),
                None => return Err(ConfigError::Escape("trailing backslash".into())),
            },
            '^' => match chars.next() {
                Some(ctl @ '@'..='_') => out.push(char::from(ctl as u8 - b'@')),
                Some(ctl @ 'a'..='z') => out.push(char::from(ctl as u8 - b'a' + 1)),
                Some(other) => return Err(ConfigError::Escape(format!("^{other}"))),
                None => out.push('^'),
            },
            _ => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AttachConfig::default();
        assert_eq!(config.escape_bytes(), b"\r~.");
        assert_eq!(config.inbound_queue, 64);
        assert!(config.label.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AttachConfig = serde_json::from_str(r#"{"label":"api v3"}"#).unwrap();
        assert_eq!(config.label.as_deref(), Some("api v3"));
        assert_eq!(config.escape, DEFAULT_ESCAPE);
        assert_eq!(config.outbound_queue, 64);
    }

    #[test]
    fn test_builders() {
        let config = AttachConfig::default()
            .with_label("web")
            .with_term("vt100")
            .without_escape();
        assert!(config.escape_bytes().is_empty());
        assert_eq!(config.term.as_deref(), Some("vt100"));
    }

    #[test]
    fn test_parse_escape() {
        assert_eq!(parse_escape("\\r~.").unwrap(), "\r~.");
        assert_eq!(parse_escape("^]").unwrap(), "\x1d");
        assert_eq!(parse_escape("^c").unwrap(), "\x03");
        assert_eq!(parse_escape("\\x1b:q").unwrap(), "\x1b:q");
        assert_eq!(parse_escape("a^").unwrap(), "a^");
    }

    #[test]
    fn test_parse_escape_errors() {
        assert!(parse_escape("\\q").is_err());
        assert!(parse_escape("\\").is_err());
        assert!(parse_escape("\\xZZ").is_err());
        assert!(parse_escape("\\xff").is_err());
        assert!(parse_escape("\\x1").is_err());
    }
}
