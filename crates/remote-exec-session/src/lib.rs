//! Interactive exec sessions.
//!
//! Provides:
//! - `ExecClient` - Attach local stdio to a remote process
//! - `EscapeWatcher` - Detach on a locally typed escape sequence
//! - `AttachConfig` - Session tuning
//! - Status sinks for connection progress

pub mod client;
pub mod config;
pub mod error;
pub mod escape;
pub mod status;

pub use client::ExecClient;
pub use config::{AttachConfig, DEFAULT_ESCAPE, parse_escape};
pub use error::{ConfigError, SessionError, SessionOutcome};
pub use escape::EscapeWatcher;
pub use status::{LogStatus, NoopStatus, TermStatus};
