//! Core abstractions for remote exec sessions.
//!
//! This crate provides the fundamental building blocks:
//! - `Session` - What to run on the remote side, and whether to allocate a pty
//! - `ClientFrame` / `ServerFrame` - Typed frames for each stream direction
//! - `FrameSink`, `FrameSource`, `ExecStream` - The duplex stream seam
//! - `StatusSink` - Textual connection progress

pub mod frame;
pub mod session;
pub mod traits;

pub use frame::{ClientFrame, ServerFrame};
pub use session::{PtyRequest, Session, WindowSize};
pub use traits::{ExecStream, FrameSink, FrameSource, StatusSink, TransportError};
