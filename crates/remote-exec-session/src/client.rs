//! Session controller: attaches local stdio to a remote process.
//!
//! A session moves through four states:
//! - init: build the optional pty request and send `Start`
//! - awaiting open: the first inbound frame must be `Open`
//! - active: keystrokes, output and resizes flow until `Exit` or cancellation
//! - closed: send side closed, raw mode restored, resize subscription released

use futures::FutureExt;
use remote_exec_core::{
    ClientFrame, ExecStream, FrameSink, FrameSource, PtyRequest, ServerFrame, Session, StatusSink,
};
use remote_exec_terminal::{RawModeGuard, ResizeWatcher, TerminalControl};
use remote_exec_transport::{FrameWriter, close_sink, spawn_outbound};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    sync::mpsc::{self, error::TrySendError},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::AttachConfig,
    error::{SessionError, SessionOutcome},
    escape::EscapeWatcher,
    status::NoopStatus,
};

/// Upper bound on frames taken from the stream after cancellation.
const CANCEL_DRAIN_LIMIT: usize = 256;

/// Interactive exec client for one remote process.
pub struct ExecClient<T> {
    terminal: T,
    status: Box<dyn StatusSink>,
    config: AttachConfig,
    target: String,
    args: Vec<String>,
}

impl<T: TerminalControl> ExecClient<T> {
    /// Create a client for `target` running `args`.
    pub fn new<I>(terminal: T, target: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            terminal,
            status: Box::new(NoopStatus),
            config: AttachConfig::default(),
            target: target.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Report connection progress to `status`. Only used for interactive sessions.
    #[must_use]
    pub fn with_status(mut self, status: impl StatusSink + 'static) -> Self {
        self.status = Box::new(status);
        self
    }

    /// Use the given configuration.
    #[must_use]
    pub fn with_config(mut self, config: AttachConfig) -> Self {
        self.config = config;
        self
    }

    fn label(&self) -> &str {
        self.config.label.as_deref().unwrap_or(&self.target)
    }

    fn term(&self) -> String {
        self.config
            .term
            .clone()
            .unwrap_or_else(|| self.terminal.term())
    }

    /// Run the session to completion.
    ///
    /// `input` is forwarded as keystrokes, remote output is written to
    /// `output`. Cancelling `cancel` ends the session with code 1, unless an
    /// `Exit` frame is already waiting.
    pub async fn run<S, I, O>(
        mut self,
        stream: S,
        input: I,
        output: O,
        cancel: CancellationToken,
    ) -> SessionOutcome
    where
        S: ExecStream,
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send,
    {
        let (mut sink, mut source) = stream.into_split();

        if !self.terminal.is_interactive() {
            self.status = Box::new(NoopStatus);
        }

        let opened = tokio::select! {
            biased;
            opened = self.open(&mut sink, &mut source) => Some(opened),
            () = cancel.cancelled() => None,
        };
        self.status.close();

        let pty_enabled = match opened {
            Some(Ok(pty_enabled)) => pty_enabled,
            Some(Err((code, error))) => {
                close_sink(&mut sink).await;
                return SessionOutcome::failed(code, error);
            }
            None => {
                tracing::debug!("Cancelled before the session opened");
                close_sink(&mut sink).await;
                return SessionOutcome::cancelled();
            }
        };

        let raw = if pty_enabled && self.terminal.input_is_terminal() {
            match self.terminal.enter_raw() {
                Ok(guard) => guard,
                Err(e) => {
                    close_sink(&mut sink).await;
                    return SessionOutcome::failed(0, e.into());
                }
            }
        } else {
            RawModeGuard::inactive()
        };

        let active = Active {
            terminal: &self.terminal,
            config: &self.config,
            pty_enabled,
        };
        active.run(sink, source, input, output, raw, cancel).await
    }

    /// Send `Start` and wait for `Open`. Returns whether a pty was requested.
    async fn open<Si, So>(
        &mut self,
        sink: &mut Si,
        source: &mut So,
    ) -> Result<bool, (i32, SessionError)>
    where
        Si: FrameSink,
        So: FrameSource,
    {
        let pty = if self.terminal.is_interactive() {
            let connecting = format!("Connecting to {}...", self.label());
            self.status.update(&connecting);
            let size = self
                .terminal
                .size()
                .map_err(|e| (0, SessionError::from(e)))?;
            Some(PtyRequest::new(self.term(), size))
        } else {
            None
        };

        let session = Session {
            target: self.target.clone(),
            args: self.args.clone(),
            pty,
        };
        let pty_enabled = session.pty_enabled();

        self.status.update("Initializing session...");
        tracing::debug!(session_target = %session.target, pty = pty_enabled, "Sending start frame");
        sink.send(ClientFrame::Start(session))
            .await
            .map_err(|e| (0, SessionError::from(e)))?;

        self.status.update("Waiting for instance assignment...");
        match source.recv().await {
            Ok(ServerFrame::Open) => {}
            Ok(other) => {
                tracing::warn!(frame = other.kind(), "Unexpected opening message");
                return Err((1, SessionError::Protocol("unexpected opening message".into())));
            }
            Err(e) => return Err((1, e.into())),
        }

        if pty_enabled {
            let connected = format!("Connected to {}", self.label());
            self.status.success(&connected);
        }
        Ok(pty_enabled)
    }
}

/// Borrowed state for the active phase.
struct Active<'a, T> {
    terminal: &'a T,
    config: &'a AttachConfig,
    pty_enabled: bool,
}

impl<T: TerminalControl> Active<'_, T> {
    async fn run<Si, So, I, O>(
        &self,
        sink: Si,
        source: So,
        input: I,
        mut output: O,
        mut raw: RawModeGuard,
        parent: CancellationToken,
    ) -> SessionOutcome
    where
        Si: FrameSink + 'static,
        So: FrameSource + 'static,
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send,
    {
        if self.pty_enabled {
            if let Err(e) = write_frame(&mut output, b"\r").await {
                tracing::debug!(error = %e, "Failed to reset cursor");
            }
        }

        let cancel = parent.child_token();

        let (outbound, writer_task) =
            spawn_outbound(sink, self.config.outbound_queue, cancel.clone());
        let (inbound_tx, mut inbound) = mpsc::channel(self.config.inbound_queue.max(1));
        let receive_task = tokio::spawn(receive(source, inbound_tx, cancel.clone()));

        let keystrokes = EscapeWatcher::new(input, self.config.escape_bytes(), cancel.clone());
        let forward_task = tokio::spawn(forward(
            keystrokes,
            FrameWriter::new(outbound.clone()),
            cancel.clone(),
        ));

        let mut resize = if self.pty_enabled {
            match self.terminal.resize_signals() {
                Ok(signals) => ResizeWatcher::spawn(signals, cancel.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, "Resize notifications unavailable");
                    ResizeWatcher::disabled()
                }
            }
        } else {
            ResizeWatcher::disabled()
        };

        // Inbound frames are polled first so a ready `Exit` wins over cancellation.
        let exited = loop {
            tokio::select! {
                biased;
                frame = inbound.recv() => match frame {
                    Some(ServerFrame::Output(data)) => {
                        if let Err(e) = write_frame(&mut output, &data).await {
                            tracing::warn!(error = %e, "Failed to write output");
                        }
                    }
                    Some(ServerFrame::Exit { code }) => {
                        tracing::debug!(code, "Remote process exited");
                        break Some(code);
                    }
                    Some(other) => {
                        tracing::warn!(frame = other.kind(), "Unknown event type");
                    }
                    None => break None,
                },
                () = cancel.cancelled() => break None,
                () = resize.changed() => self.send_resize(&outbound),
            }
        };

        cancel.cancel();
        raw.restore();
        resize.stop();

        let outcome = match exited {
            Some(code) => SessionOutcome::exited(code),
            None => exit_after_cancel(&mut inbound).await,
        };
        drop(inbound);
        drop(outbound);

        if let Err(e) = forward_task.await {
            tracing::debug!(error = %e, "Forwarding task failed");
        }
        if let Err(e) = receive_task.await {
            tracing::debug!(error = %e, "Receive task failed");
        }
        match writer_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "Outbound stream failed"),
            Err(e) => tracing::debug!(error = %e, "Outbound task failed"),
        }

        outcome
    }

    fn send_resize(&self, outbound: &mpsc::Sender<ClientFrame>) {
        let size = match self.terminal.size() {
            Ok(size) => size,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping resize, size query failed");
                return;
            }
        };

        match outbound.try_send(ClientFrame::Resize(size)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::debug!("Skipping resize, outbound queue full"),
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Skipping resize, outbound stream closed");
            }
        }
    }
}

/// Pull inbound frames into the session queue until `Exit`, failure or cancellation.
///
/// Once cancelled, frames the stream already holds are still handed over so
/// a waiting `Exit` is not lost.
async fn receive<S: FrameSource>(
    mut source: S,
    queue: mpsc::Sender<ServerFrame>,
    cancel: CancellationToken,
) {
    let mut drained = 0;
    loop {
        let result = if cancel.is_cancelled() {
            if drained == CANCEL_DRAIN_LIMIT {
                return;
            }
            drained += 1;
            match source.recv().now_or_never() {
                Some(result) => result,
                None => return,
            }
        } else {
            tokio::select! {
                biased;
                result = source.recv() => result,
                () = cancel.cancelled() => continue,
            }
        };

        let frame = match result {
            Ok(frame) => frame,
            Err(e) => {
                if cancel.is_cancelled() {
                    tracing::debug!(error = %e, "Receive stopped");
                } else {
                    tracing::error!(error = %e, "Receive error");
                    cancel.cancel();
                }
                return;
            }
        };

        let last = matches!(frame, ServerFrame::Exit { .. });
        if queue.send(frame).await.is_err() || last {
            return;
        }
    }
}

/// Wait for the receive task to hand over what it still has. An `Exit`
/// among those frames decides the outcome; anything else is dropped.
async fn exit_after_cancel(inbound: &mut mpsc::Receiver<ServerFrame>) -> SessionOutcome {
    while let Some(frame) = inbound.recv().await {
        if let ServerFrame::Exit { code } = frame {
            tracing::debug!(code, "Remote process exited");
            return SessionOutcome::exited(code);
        }
    }
    SessionOutcome::cancelled()
}

/// Copy keystrokes into `Input` frames until the input ends or the session is cancelled.
async fn forward<R>(mut input: EscapeWatcher<R>, mut writer: FrameWriter, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    // The copy is polled first so bytes read alongside the escape sequence are still sent.
    tokio::select! {
        biased;
        result = tokio::io::copy(&mut input, &mut writer) => match result {
            Ok(bytes) => tracing::debug!(bytes, "Input closed"),
            Err(e) => tracing::debug!(error = %e, "Input forwarding stopped"),
        },
        () = cancel.cancelled() => {}
    }
}

async fn write_frame<O: AsyncWrite + Unpin>(output: &mut O, data: &[u8]) -> std::io::Result<()> {
    output.write_all(data).await?;
    output.flush().await
}
