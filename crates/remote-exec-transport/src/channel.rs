//! In-process exec stream backed by channels.
//!
//! Useful for embedding a session next to its server and for tests.

use async_trait::async_trait;
use remote_exec_core::{
    ClientFrame, ExecStream, FrameSink, FrameSource, ServerFrame, TransportError,
};
use tokio::sync::mpsc;

/// Client end of an in-process stream.
pub struct ChannelStream {
    sink: ChannelSink,
    source: ChannelSource,
}

impl ChannelStream {
    /// Create a connected client end and peer end.
    #[must_use]
    pub fn pair() -> (Self, ChannelPeer) {
        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        let stream = Self {
            sink: ChannelSink {
                tx: Some(client_tx),
            },
            source: ChannelSource { rx: server_rx },
        };

        let peer = ChannelPeer {
            rx: client_rx,
            tx: Some(server_tx),
        };

        (stream, peer)
    }
}

impl ExecStream for ChannelStream {
    type Sink = ChannelSink;
    type Source = ChannelSource;

    fn into_split(self) -> (Self::Sink, Self::Source) {
        (self.sink, self.source)
    }
}

/// Send half of a [`ChannelStream`].
pub struct ChannelSink {
    tx: Option<mpsc::UnboundedSender<ClientFrame>>,
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        self.tx
            .as_ref()
            .ok_or(TransportError::Closed)?
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

/// Receive half of a [`ChannelStream`].
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<ServerFrame>,
}

#[async_trait]
impl FrameSource for ChannelSource {
    async fn recv(&mut self) -> Result<ServerFrame, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }
}

/// Remote end of a [`ChannelStream`].
pub struct ChannelPeer {
    rx: mpsc::UnboundedReceiver<ClientFrame>,
    tx: Option<mpsc::UnboundedSender<ServerFrame>>,
}

impl ChannelPeer {
    /// Receive the next client frame. `None` once the client closed its send side.
    pub async fn recv(&mut self) -> Option<ClientFrame> {
        self.rx.recv().await
    }

    /// Receive a client frame without waiting.
    pub fn try_recv(&mut self) -> Option<ClientFrame> {
        self.rx.try_recv().ok()
    }

    /// Send a frame to the client.
    ///
    /// # Errors
    /// Returns error if the client is gone or the peer was closed.
    pub fn send(&self, frame: ServerFrame) -> Result<(), TransportError> {
        self.tx
            .as_ref()
            .ok_or(TransportError::Closed)?
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    /// Drop the server-to-client direction. The client's next receive fails.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
