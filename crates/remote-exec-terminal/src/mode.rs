//! Terminal detection, size queries and raw mode.

use std::{
    io::{self, IsTerminal},
    sync::atomic::{AtomicBool, Ordering},
};

use remote_exec_core::WindowSize;
use thiserror::Error;

use crate::resize::ResizeSignals;

/// Terminal type used when `$TERM` is unset or empty.
pub const DEFAULT_TERM: &str = "xterm";

/// Set while some session holds the process-wide raw mode.
static RAW_MODE_HELD: AtomicBool = AtomicBool::new(false);

/// Terminal error.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("Not a terminal")]
    NotATerminal,
    #[error("Terminal size query failed: {0}")]
    Query(#[source] io::Error),
    #[error("Failed to enter raw mode: {0}")]
    RawMode(#[source] io::Error),
    #[error("Raw mode is already held by another session")]
    RawModeBusy,
    #[error("Failed to subscribe to resize notifications: {0}")]
    Signal(#[source] io::Error),
}

/// Access to the local terminal an exec session is attached to.
pub trait TerminalControl: Send + Sync {
    /// Whether the output destination is a terminal device.
    fn is_interactive(&self) -> bool;

    /// Whether the input source is a terminal device.
    fn input_is_terminal(&self) -> bool;

    /// Query the current dimensions.
    ///
    /// # Errors
    /// Returns `TerminalError::Query` if the device does not support size queries.
    fn size(&self) -> Result<WindowSize, TerminalError>;

    /// Put the input into raw mode until the returned guard is restored or dropped.
    ///
    /// # Errors
    /// Returns error if raw mode cannot be enabled or is already held.
    fn enter_raw(&self) -> Result<RawModeGuard, TerminalError>;

    /// Terminal type to request on the remote side.
    fn term(&self) -> String;

    /// Subscribe to window-change notifications.
    ///
    /// # Errors
    /// Returns error if the OS subscription fails.
    fn resize_signals(&self) -> Result<ResizeSignals, TerminalError>;
}

type RestoreFn = Box<dyn FnOnce() -> io::Result<()> + Send>;

/// Scoped raw mode. Restores the previous mode exactly once.
#[must_use = "raw mode is restored as soon as the guard is dropped"]
pub struct RawModeGuard {
    restore: Option<RestoreFn>,
}

impl RawModeGuard {
    /// Create a guard that runs `restore` when released.
    pub fn new(restore: impl FnOnce() -> io::Result<()> + Send + 'static) -> Self {
        Self {
            restore: Some(Box::new(restore)),
        }
    }

    /// A guard with nothing to restore.
    pub fn inactive() -> Self {
        Self { restore: None }
    }

    /// Whether the guard still has a mode to restore.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.restore.is_some()
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn restore(&mut self) {
        if let Some(restore) = self.restore.take() {
            if let Err(e) = restore() {
                tracing::warn!(error = %e, "Failed to restore terminal mode");
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

impl std::fmt::Debug for RawModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawModeGuard")
            .field("active", &self.is_active())
            .finish()
    }
}

/// The process's own stdin/stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTerminal;

impl LocalTerminal {
    /// Create a handle to the local terminal.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TerminalControl for LocalTerminal {
    fn is_interactive(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn input_is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn size(&self) -> Result<WindowSize, TerminalError> {
        if !self.is_interactive() {
            return Err(TerminalError::NotATerminal);
        }
        let (cols, rows) = crossterm::terminal::size().map_err(TerminalError::Query)?;
        Ok(WindowSize::new(rows, cols))
    }

    fn enter_raw(&self) -> Result<RawModeGuard, TerminalError> {
        if RAW_MODE_HELD
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TerminalError::RawModeBusy);
        }

        if let Err(e) = crossterm::terminal::enable_raw_mode() {
            RAW_MODE_HELD.store(false, Ordering::Release);
            return Err(TerminalError::RawMode(e));
        }

        tracing::debug!("Entered raw mode");
        Ok(RawModeGuard::new(|| {
            let result = crossterm::terminal::disable_raw_mode();
            RAW_MODE_HELD.store(false, Ordering::Release);
            tracing::debug!("Restored terminal mode");
            result
        }))
    }

    fn term(&self) -> String {
        term_or_default(std::env::var("TERM").ok())
    }

    #[cfg(unix)]
    fn resize_signals(&self) -> Result<ResizeSignals, TerminalError> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigwinch = signal(SignalKind::window_change()).map_err(TerminalError::Signal)?;
        Ok(Box::pin(futures::stream::poll_fn(move |cx| {
            sigwinch.poll_recv(cx)
        })))
    }

    #[cfg(not(unix))]
    fn resize_signals(&self) -> Result<ResizeSignals, TerminalError> {
        // No window-change signal to subscribe to.
        Ok(Box::pin(futures::stream::empty()))
    }
}

fn term_or_default(term: Option<String>) -> String {
    term.filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TERM.to_string())
}
