//! Local terminal management for exec sessions.
//!
//! Provides:
//! - `TerminalControl` - TTY detection, size queries, raw mode
//! - `LocalTerminal` - Implementation backed by the process's stdio
//! - `ResizeWatcher` - Coalesced window-change notifications

pub mod mode;
pub mod resize;

pub use mode::{DEFAULT_TERM, LocalTerminal, RawModeGuard, TerminalControl, TerminalError};
pub use resize::{ResizeSignals, ResizeWatcher};
