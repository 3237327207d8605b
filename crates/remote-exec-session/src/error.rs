//! Session errors and the final outcome.

use remote_exec_core::TransportError;
use remote_exec_terminal::TerminalError;
use thiserror::Error;

/// Error that ended a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Connection error: {0}")]
    Connection(#[from] TransportError),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Terminal error: {0}")]
    Terminal(#[from] TerminalError),
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid escape sequence: {0}")]
    Escape(String),
}

/// Final exit code and optional error of a session.
#[derive(Debug)]
#[must_use]
pub struct SessionOutcome {
    code: i32,
    error: Option<SessionError>,
}

impl SessionOutcome {
    /// The remote process exited with `code`.
    pub const fn exited(code: i32) -> Self {
        Self { code, error: None }
    }

    /// The session was cancelled locally or lost its stream.
    pub const fn cancelled() -> Self {
        Self {
            code: 1,
            error: None,
        }
    }

    /// The session failed.
    pub const fn failed(code: i32, error: SessionError) -> Self {
        Self {
            code,
            error: Some(error),
        }
    }

    /// Exit code.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.code
    }

    /// Error, if the session failed.
    #[must_use]
    pub const fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Split into code and error.
    #[must_use]
    pub fn into_parts(self) -> (i32, Option<SessionError>) {
        (self.code, self.error)
    }

    /// Convert to a result, preferring the error when there is one.
    ///
    /// # Errors
    /// Returns the session error if the session failed.
    pub fn into_result(self) -> Result<i32, SessionError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes() {
        let exited = SessionOutcome::exited(42);
        assert_eq!(exited.code(), 42);
        assert!(exited.error().is_none());

        let cancelled = SessionOutcome::cancelled();
        assert_eq!(cancelled.into_result().unwrap(), 1);

        let failed = SessionOutcome::failed(
            1,
            SessionError::Protocol("unexpected opening message".into()),
        );
        let (code, error) = failed.into_parts();
        assert_eq!(code, 1);
        assert_eq!(
            error.unwrap().to_string(),
            "Protocol error: unexpected opening message"
        );
    }
}
