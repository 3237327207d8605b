//! Detach detection on the keystroke stream.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll, ready},
};

use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::CancellationToken;

/// Pass-through reader that cancels the session when it sees the escape
/// sequence.
///
/// Every byte is handed to the caller unchanged, including the sequence
/// itself. The start of the stream counts as following a carriage return,
/// so `\r~.` also matches `~.` typed as the very first keys.
pub struct EscapeWatcher<R> {
    inner: R,
    sentinel: Vec<u8>,
    window: Vec<u8>,
    cancel: CancellationToken,
    triggered: bool,
}

impl<R> EscapeWatcher<R> {
    /// Wrap `inner`. An empty `sentinel` disables detection.
    pub fn new(inner: R, sentinel: impl Into<Vec<u8>>, cancel: CancellationToken) -> Self {
        let sentinel = sentinel.into();
        let mut window = Vec::with_capacity(sentinel.len());
        window.push(b'\r');
        Self {
            inner,
            sentinel,
            window,
            cancel,
            triggered: false,
        }
    }

    /// Whether the sequence has been seen.
    #[must_use]
    pub const fn triggered(&self) -> bool {
        self.triggered
    }

    /// Unwrap the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn scan(&mut self, bytes: &[u8]) -> bool {
        if self.sentinel.is_empty() {
            return false;
        }

        let mut found = false;
        for &b in bytes {
            if self.window.len() >= self.sentinel.len() {
                self.window.remove(0);
            }
            self.window.push(b);
            found |= self.window == self.sentinel;
        }
        found
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for EscapeWatcher<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        if this.scan(&buf.filled()[before..]) && !this.triggered {
            this.triggered = true;
            tracing::info!("Escape sequence detected, detaching");
            this.cancel.cancel();
        }

        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    use super::*;

    async fn read_all(data: &[&str], sentinel: &str) -> (Vec<u8>, bool) {
        let (mut tx, rx) = duplex(1024);
        let cancel = CancellationToken::new();
        let mut watcher = EscapeWatcher::new(rx, sentinel.as_bytes(), cancel.clone());

        let mut out = Vec::new();
        for chunk in data {
            tx.write_all(chunk.as_bytes()).await.unwrap();
            let mut buf = vec![0; 64];
            let n = watcher.read(&mut buf).await.unwrap();
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(watcher.triggered(), cancel.is_cancelled());
        (out, cancel.is_cancelled())
    }

    #[tokio::test]
    async fn test_passes_bytes_through() {
        let (out, cancelled) = read_all(&["ls -la\r", "exit\r"], "\r~.").await;
        assert_eq!(out, b"ls -la\rexit\r");
        assert!(!cancelled);
    }

    #[tokio::test]
    async fn test_detects_and_still_forwards() {
        let (out, cancelled) = read_all(&["ls\r~.more"], "\r~.").await;
        assert_eq!(out, b"ls\r~.more");
        assert!(cancelled);
    }

    #[tokio::test]
    async fn test_detects_across_reads() {
        let (out, cancelled) = read_all(&["ls\r", "~", "."], "\r~.").await;
        assert_eq!(out, b"ls\r~.");
        assert!(cancelled);
    }

    #[tokio::test]
    async fn test_stream_start_is_line_start() {
        let (_, cancelled) = read_all(&["~."], "\r~.").await;
        assert!(cancelled);
    }

    #[tokio::test]
    async fn test_mid_line_does_not_match() {
        let (_, cancelled) = read_all(&["echo ~.", "\r"], "\r~.").await;
        assert!(!cancelled);
    }

    #[tokio::test]
    async fn test_empty_sentinel_disables() {
        let (_, cancelled) = read_all(&["~.", "\r~."], "").await;
        assert!(!cancelled);
    }

    #[tokio::test]
    async fn test_custom_single_byte_sentinel() {
        let (out, cancelled) = read_all(&["abc\x1d"], "\x1d").await;
        assert_eq!(out, b"abc\x1d");
        assert!(cancelled);
    }
}
