//! Session description sent once as the opening frame.

use serde::{Deserialize, Serialize};

/// Terminal dimensions.
///
/// `height` and `width` mirror `rows` and `cols`: local size queries only
/// report character cells, and the remote side expects all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
    pub height: u16,
    pub width: u16,
}

impl WindowSize {
    /// Build a size from a character-cell grid.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            height: rows,
            width: cols,
        }
    }
}

/// Request for a pseudo-terminal on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtyRequest {
    /// Whether a pty should be allocated.
    pub enable: bool,
    /// Terminal type, usually the local `$TERM`.
    pub term: String,
    /// Initial dimensions.
    pub window_size: WindowSize,
}

impl PtyRequest {
    /// Create an enabled pty request.
    #[must_use]
    pub fn new(term: impl Into<String>, window_size: WindowSize) -> Self {
        Self {
            enable: true,
            term: term.into(),
            window_size,
        }
    }
}

/// The logical attach operation.
///
/// Constructed from caller inputs and never changed after it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Identifier of the remote target to attach to.
    pub target: String,
    /// Argument vector for the remote process.
    #[serde(default)]
    pub args: Vec<String>,
    /// Pty request. `None` runs the remote process without a pty.
    #[serde(default)]
    pub pty: Option<PtyRequest>,
}

impl Session {
    /// Create a session without a pty.
    #[must_use]
    pub fn new<I>(target: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            target: target.into(),
            args: args.into_iter().map(Into::into).collect(),
            pty: None,
        }
    }

    /// Attach a pty request.
    #[must_use]
    pub fn with_pty(mut self, pty: PtyRequest) -> Self {
        self.pty = Some(pty);
        self
    }

    /// Whether the remote process gets a pty.
    #[must_use]
    pub fn pty_enabled(&self) -> bool {
        self.pty.as_ref().is_some_and(|p| p.enable)
    }
}
