//! Core traits for the exec stream and status reporting.

use async_trait::async_trait;
use thiserror::Error;

use crate::frame::{ClientFrame, ServerFrame};

/// Stream-level failure. Always terminal for the session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stream closed")]
    Closed,
    #[error("Codec error: {0}")]
    Codec(String),
}

/// Send half of an exec stream.
///
/// Each `send` transmits one complete frame.
#[async_trait]
pub trait FrameSink: Send {
    /// Send a single frame.
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError>;

    /// Close the send direction. The receive direction stays open.
    async fn close_send(&mut self) -> Result<(), TransportError>;
}

/// Receive half of an exec stream.
#[async_trait]
pub trait FrameSource: Send {
    /// Receive the next frame.
    async fn recv(&mut self) -> Result<ServerFrame, TransportError>;
}

/// A connected bidirectional exec stream that can be split into halves
/// driven by independent tasks.
pub trait ExecStream {
    type Sink: FrameSink + 'static;
    type Source: FrameSource + 'static;

    /// Split into independently owned send and receive halves.
    fn into_split(self) -> (Self::Sink, Self::Source);
}

/// Sink for textual progress updates while connecting.
pub trait StatusSink: Send {
    /// Replace the current status line.
    fn update(&mut self, msg: &str);

    /// Report a final success message.
    fn success(&mut self, msg: &str) {
        self.update(msg);
    }

    /// Finish reporting. Further updates are ignored.
    fn close(&mut self);
}

#[async_trait]
impl<T: FrameSink + ?Sized> FrameSink for Box<T> {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        (**self).send(frame).await
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        (**self).close_send().await
    }
}

#[async_trait]
impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    async fn recv(&mut self) -> Result<ServerFrame, TransportError> {
        (**self).recv().await
    }
}

impl<T: StatusSink + ?Sized> StatusSink for Box<T> {
    fn update(&mut self, msg: &str) {
        (**self).update(msg);
    }

    fn success(&mut self, msg: &str) {
        (**self).success(msg);
    }

    fn close(&mut self) {
        (**self).close();
    }
}
