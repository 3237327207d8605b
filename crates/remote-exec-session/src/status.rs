//! Status sinks for connection progress.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveToColumn,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use remote_exec_core::StatusSink;

/// Discards every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatus;

impl StatusSink for NoopStatus {
    fn update(&mut self, _msg: &str) {}

    fn close(&mut self) {}
}

/// Reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatus;

impl StatusSink for LogStatus {
    fn update(&mut self, msg: &str) {
        tracing::info!(status = msg, "Session status");
    }

    fn close(&mut self) {}
}

/// Single status line, rewritten in place on a terminal.
pub struct TermStatus<W: Write + Send> {
    out: W,
    active: bool,
    closed: bool,
}

impl TermStatus<io::Stderr> {
    /// Status line on stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> TermStatus<W> {
    /// Status line on the given writer.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            active: false,
            closed: false,
        }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, msg: &str, color: Option<Color>) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        if let Some(color) = color {
            queue!(self.out, SetForegroundColor(color), Print(msg), ResetColor)?;
        } else {
            queue!(self.out, Print(msg))?;
        }
        self.out.flush()
    }

    fn finish(&mut self, msg: &str) -> io::Result<()> {
        self.draw(msg, Some(Color::Green))?;
        queue!(self.out, Print("\r\n"))?;
        self.out.flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        self.out.flush()
    }
}

fn report(result: io::Result<()>) {
    if let Err(e) = result {
        tracing::debug!(error = %e, "Failed to write status line");
    }
}

impl<W: Write + Send> StatusSink for TermStatus<W> {
    fn update(&mut self, msg: &str) {
        if self.closed {
            return;
        }
        self.active = true;
        report(self.draw(msg, None));
    }

    fn success(&mut self, msg: &str) {
        if self.closed {
            return;
        }
        report(self.finish(msg));
        self.active = false;
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.active {
            report(self.clear());
        }
        self.active = false;
        self.closed = true;
    }
}
