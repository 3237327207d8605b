//! Outbound frame path.
//!
//! The outbound side of the exec stream is presented as a plain byte sink:
//! [`FrameWriter`] turns every write into one `Input` frame on a queue, and
//! [`spawn_outbound`] drains that queue into the stream as the only writer.
//! The inbound side stays structured.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
    time::Duration,
};

use remote_exec_core::{ClientFrame, FrameSink, TransportError};
use tokio::{io::AsyncWrite, sync::mpsc, task::JoinHandle};
use tokio_util::sync::{CancellationToken, PollSender};

/// Largest payload carried by a single `Input` frame.
pub const MAX_INPUT_CHUNK: usize = 32 * 1024;

/// Byte sink that emits one `Input` frame per write.
pub struct FrameWriter {
    tx: PollSender<ClientFrame>,
}

impl FrameWriter {
    /// Create a writer feeding the given outbound queue.
    #[must_use]
    pub fn new(tx: mpsc::Sender<ClientFrame>) -> Self {
        Self {
            tx: PollSender::new(tx),
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "outbound stream closed")
}

impl AsyncWrite for FrameWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        let this = self.get_mut();
        ready!(this.tx.poll_reserve(cx)).map_err(|_| closed())?;

        let n = buf.len().min(MAX_INPUT_CHUNK);
        this.tx
            .send_item(ClientFrame::input(&buf[..n]))
            .map_err(|_| closed())?;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().tx.close();
        Poll::Ready(Ok(()))
    }
}

/// Longest wait for a stream to close its send direction.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Close the send direction of `sink`, giving up after [`CLOSE_TIMEOUT`].
pub async fn close_sink<S: FrameSink + ?Sized>(sink: &mut S) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close_send()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Failed to close send direction"),
        Err(_) => tracing::debug!("Timed out closing send direction"),
    }
}

/// Spawn the single writer task for a stream's send half.
///
/// Frames queued on the returned sender are sent in order, one complete
/// frame per `send`. Once every sender is dropped the queue drains and the
/// send direction is closed. Cancelling `cancel` abandons queued frames and
/// any send in flight. A send failure stops the task; remaining frames are
/// discarded.
pub fn spawn_outbound<S>(
    mut sink: S,
    capacity: usize,
    cancel: CancellationToken,
) -> (mpsc::Sender<ClientFrame>, JoinHandle<Result<(), TransportError>>)
where
    S: FrameSink + 'static,
{
    let (tx, mut rx) = mpsc::channel::<ClientFrame>(capacity.max(1));

    let task = tokio::spawn(async move {
        let mut result = Ok(());
        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                frame = rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            let kind = frame.kind();
            let sent = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(frame = kind, "Send abandoned on cancellation");
                    break;
                }
                sent = sink.send(frame) => sent,
            };
            if let Err(e) = sent {
                tracing::warn!(error = %e, frame = kind, "Failed to send frame");
                result = Err(e);
                break;
            }
        }
        rx.close();

        close_sink(&mut sink).await;
        result
    });

    (tx, task)
}
