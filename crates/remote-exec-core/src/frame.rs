//! Typed frames for each direction of the exec stream.

use bytes::Bytes;

use crate::session::{Session, WindowSize};

/// Frame sent from the client to the remote peer.
///
/// Exactly one `Start` precedes every other outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Opening frame describing the session.
    Start(Session),
    /// Raw keystrokes.
    Input(Bytes),
    /// New terminal dimensions. Only sent when a pty was requested.
    Resize(WindowSize),
}

impl ClientFrame {
    /// Create an input frame from raw bytes.
    #[must_use]
    pub fn input(data: &[u8]) -> Self {
        Self::Input(Bytes::copy_from_slice(data))
    }

    /// Short name of the frame type, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Input(_) => "input",
            Self::Resize(_) => "resize",
        }
    }
}

/// Frame received from the remote peer.
///
/// Exactly one `Open` comes first and exactly one `Exit` comes last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// Acknowledgment that the session was assigned.
    Open,
    /// Raw output of the remote process.
    Output(Bytes),
    /// The remote process exited.
    Exit { code: i32 },
    /// A frame type this client does not understand, carrying its tag.
    Unknown(String),
}

impl ServerFrame {
    /// Create an output frame from raw bytes.
    #[must_use]
    pub fn output(data: &[u8]) -> Self {
        Self::Output(Bytes::copy_from_slice(data))
    }

    /// Short name of the frame type, for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Output(_) => "output",
            Self::Exit { .. } => "exit",
            Self::Unknown(tag) => tag,
        }
    }
}
