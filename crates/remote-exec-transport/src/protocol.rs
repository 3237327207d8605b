//! Wire protocol for the exec stream.
//!
//! Every frame is a JSON object tagged by `type`. Byte payloads are base64.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use remote_exec_core::{ClientFrame, PtyRequest, ServerFrame, Session, WindowSize};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Wire encoding error.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Message has no type tag")]
    MissingTag,
}

/// Message from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open the session. Always the first message.
    Start {
        target: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pty: Option<PtyRequest>,
    },
    /// Terminal input data (base64 encoded).
    Input { data: String },
    /// Resize terminal.
    Resize {
        rows: u16,
        cols: u16,
        height: u16,
        width: u16,
    },
}

impl From<&ClientFrame> for ClientMessage {
    fn from(frame: &ClientFrame) -> Self {
        match frame {
            ClientFrame::Start(session) => Self::Start {
                target: session.target.clone(),
                args: session.args.clone(),
                pty: session.pty.clone(),
            },
            ClientFrame::Input(data) => Self::Input {
                data: BASE64.encode(data),
            },
            ClientFrame::Resize(size) => Self::Resize {
                rows: size.rows,
                cols: size.cols,
                height: size.height,
                width: size.width,
            },
        }
    }
}

impl TryFrom<ClientMessage> for ClientFrame {
    type Error = WireError;

    fn try_from(msg: ClientMessage) -> Result<Self, Self::Error> {
        Ok(match msg {
            ClientMessage::Start { target, args, pty } => {
                Self::Start(Session { target, args, pty })
            }
            ClientMessage::Input { data } => Self::Input(Bytes::from(BASE64.decode(data)?)),
            ClientMessage::Resize {
                rows,
                cols,
                height,
                width,
            } => Self::Resize(WindowSize {
                rows,
                cols,
                height,
                width,
            }),
        })
    }
}

/// Message from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session assigned. Always the first message.
    Open,
    /// Terminal output data (base64 encoded).
    Output { data: String },
    /// Remote process exited.
    Exit { code: i32 },
}

impl ServerMessage {
    /// Tags this client understands.
    pub const TAGS: [&'static str; 3] = ["open", "output", "exit"];
}

impl TryFrom<ServerMessage> for ServerFrame {
    type Error = WireError;

    fn try_from(msg: ServerMessage) -> Result<Self, Self::Error> {
        Ok(match msg {
            ServerMessage::Open => Self::Open,
            ServerMessage::Output { data } => Self::Output(Bytes::from(BASE64.decode(data)?)),
            ServerMessage::Exit { code } => Self::Exit { code },
        })
    }
}

/// Encode a client frame as one JSON document.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode_client(frame: &ClientFrame) -> Result<String, WireError> {
    Ok(serde_json::to_string(&ClientMessage::from(frame))?)
}

/// Decode a client frame.
///
/// # Errors
/// Returns error on malformed JSON, unknown types or bad payloads.
pub fn decode_client(text: &str) -> Result<ClientFrame, WireError> {
    serde_json::from_str::<ClientMessage>(text)?.try_into()
}

/// Encode a server frame as one JSON document.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode_server(frame: &ServerFrame) -> Result<String, WireError> {
    let msg = match frame {
        ServerFrame::Open => ServerMessage::Open,
        ServerFrame::Output(data) => ServerMessage::Output {
            data: BASE64.encode(data),
        },
        ServerFrame::Exit { code } => ServerMessage::Exit { code: *code },
        ServerFrame::Unknown(tag) => {
            return Ok(serde_json::json!({ "type": tag }).to_string());
        }
    };
    Ok(serde_json::to_string(&msg)?)
}

/// Decode a server frame.
///
/// Types outside [`ServerMessage::TAGS`] decode to `ServerFrame::Unknown`
/// so newer servers do not break older clients.
///
/// # Errors
/// Returns error on malformed JSON, a missing tag or a bad payload.
pub fn decode_server(text: &str) -> Result<ServerFrame, WireError> {
    let value: Value = serde_json::from_str(text)?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(WireError::MissingTag)?;

    if !ServerMessage::TAGS.contains(&tag) {
        return Ok(ServerFrame::Unknown(tag.to_string()));
    }

    serde_json::from_value::<ServerMessage>(value)?.try_into()
}
