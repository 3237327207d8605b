//! Transport layer for exec sessions.
//!
//! Provides:
//! - Wire protocol (JSON + base64)
//! - `FrameWriter` - Byte-sink view of the outbound frame path
//! - `ChannelStream` - In-process stream pair
//! - `JsonLinesStream` - Newline-delimited JSON over any byte pipe (e.g. TCP)

pub mod channel;
pub mod codec;
pub mod json_lines;
pub mod protocol;

pub use channel::{ChannelPeer, ChannelStream};
pub use codec::{CLOSE_TIMEOUT, FrameWriter, MAX_INPUT_CHUNK, close_sink, spawn_outbound};
pub use json_lines::JsonLinesStream;
pub use protocol::{ClientMessage, ServerMessage, WireError};
