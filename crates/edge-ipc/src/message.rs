//! Message schema.

use edge_core::{RenderRequest, WorkerError};
use serde::{Deserialize, Serialize};

use crate::IpcError;

/// Message received from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    /// A render request.
    Headers(RenderRequest),
    /// Any other message type. Never valid for the worker.
    Unknown(String),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl IncomingMessage {
    /// Decode a frame body.
    pub fn decode(frame: &[u8]) -> Result<Self, IpcError> {
        let envelope: Envelope = serde_json::from_slice(frame)?;
        match envelope.kind.as_str() {
            "headers" => Ok(Self::Headers(serde_json::from_value(envelope.data)?)),
            _ => Ok(Self::Unknown(envelope.kind)),
        }
    }

    /// The message type tag.
    pub fn kind(&self) -> &str {
        match self {
            Self::Headers(_) => "headers",
            Self::Unknown(kind) => kind,
        }
    }
}

/// Status line and headers of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeaders {
    /// Status code.
    pub status: u16,
    /// Header entries.
    pub headers: Vec<(String, String)>,
}

/// Failure details sent in place of the rest of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error kind.
    pub name: String,
    /// Human-readable description.
    pub message: String,
    /// Extra diagnostic context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl From<&WorkerError> for ErrorReport {
    fn from(err: &WorkerError) -> Self {
        Self {
            name: err.code().to_string(),
            message: err.to_string(),
            stack: None,
        }
    }
}

/// Message sent to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum OutgoingMessage {
    /// Response status and headers. Always first.
    Headers(ResponseHeaders),
    /// A piece of the body, as raw bytes.
    BodyChunk(Vec<u8>),
    /// End of the body. Always last.
    BodyEnd,
    /// The worker failed.
    Error(ErrorReport),
}
