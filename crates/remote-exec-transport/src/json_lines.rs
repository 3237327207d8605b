//! Exec stream over newline-delimited JSON.
//!
//! One wire message per line, in the encoding of [`crate::protocol`].

use async_trait::async_trait;
use remote_exec_core::{
    ClientFrame, ExecStream, FrameSink, FrameSource, ServerFrame, TransportError,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use crate::protocol::{self, WireError};

impl From<WireError> for TransportError {
    fn from(e: WireError) -> Self {
        Self::Codec(e.to_string())
    }
}

/// Exec stream speaking JSON lines over a reader/writer pair.
pub struct JsonLinesStream<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> JsonLinesStream<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a reader (server to client) and writer (client to server).
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl JsonLinesStream<OwnedReadHalf, OwnedWriteHalf> {
    /// Connect over TCP.
    ///
    /// # Errors
    /// Returns error if the connection cannot be established.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        Ok(Self::from_tcp(socket))
    }

    /// Use an already connected socket.
    #[must_use]
    pub fn from_tcp(socket: TcpStream) -> Self {
        let (reader, writer) = socket.into_split();
        Self::new(reader, writer)
    }
}

impl<R, W> ExecStream for JsonLinesStream<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Sink = JsonLinesSink<W>;
    type Source = JsonLinesSource<R>;

    fn into_split(self) -> (Self::Sink, Self::Source) {
        (
            JsonLinesSink {
                writer: Some(self.writer),
            },
            JsonLinesSource {
                lines: BufReader::new(self.reader).lines(),
            },
        )
    }
}

/// Send half of a [`JsonLinesStream`].
pub struct JsonLinesSink<W> {
    writer: Option<W>,
}

#[async_trait]
impl<W> FrameSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        let writer = self.writer.as_mut().ok_or(TransportError::Closed)?;
        let mut line = protocol::encode_client(&frame)?;
        line.push('\n');
        // Single write per frame so a frame is never split across sends.
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }
}

/// Receive half of a [`JsonLinesStream`].
pub struct JsonLinesSource<R> {
    lines: Lines<BufReader<R>>,
}

#[async_trait]
impl<R> FrameSource for JsonLinesSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Result<ServerFrame, TransportError> {
        loop {
            let line = self.lines.next_line().await?.ok_or(TransportError::Closed)?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return Ok(protocol::decode_server(line)?);
        }
    }
}

#[cfg(test)]
mod tests {
    use remote_exec_core::{PtyRequest, Session, WindowSize};
    use tokio::io::{AsyncReadExt, duplex};

    use super::*;

    #[tokio::test]
    async fn test_start_frame_on_the_wire() {
        let (client_w, server_r) = duplex(4096);
        let (_server_w, client_r) = duplex(4096);
        let (mut sink, _source) = JsonLinesStream::new(client_r, client_w).into_split();

        let session = Session::new("svc-7", ["/bin/sh"])
            .with_pty(PtyRequest::new("xterm", WindowSize::new(24, 80)));
        sink.send(ClientFrame::Start(session.clone())).await.unwrap();
        sink.close_send().await.unwrap();

        let mut raw = String::new();
        BufReader::new(server_r).read_to_string(&mut raw).await.unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            protocol::decode_client(lines[0]).unwrap(),
            ClientFrame::Start(session)
        );
    }

    #[tokio::test]
    async fn test_recv_decodes_lines() {
        let (client_w, _server_r) = duplex(4096);
        let (mut server_w, client_r) = duplex(4096);
        let (_sink, mut source) = JsonLinesStream::new(client_r, client_w).into_split();

        let wire = concat!(
            "{\"type\":\"open\"}\n",
            "\n",
            "{\"type\":\"output\",\"data\":\"b2sK\"}\n",
            "{\"type\":\"exit\",\"code\":3}\n",
        );
        server_w.write_all(wire.as_bytes()).await.unwrap();
        drop(server_w);

        assert_eq!(source.recv().await.unwrap(), ServerFrame::Open);
        assert_eq!(source.recv().await.unwrap(), ServerFrame::output(b"ok\n"));
        assert_eq!(source.recv().await.unwrap(), ServerFrame::Exit { code: 3 });
        assert!(matches!(source.recv().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_malformed_line_is_codec_error() {
        let (client_w, _server_r) = duplex(4096);
        let (mut server_w, client_r) = duplex(4096);
        let (_sink, mut source) = JsonLinesStream::new(client_r, client_w).into_split();

        server_w.write_all(b"{oops\n").await.unwrap();
        assert!(matches!(source.recv().await, Err(TransportError::Codec(_))));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (client_w, _server_r) = duplex(4096);
        let (_server_w, client_r) = duplex(4096);
        let (mut sink, _source) = JsonLinesStream::new(client_r, client_w).into_split();

        sink.close_send().await.unwrap();
        sink.close_send().await.unwrap();
        assert!(matches!(
            sink.send(ClientFrame::input(b"x")).await,
            Err(TransportError::Closed)
        ));
    }
}
