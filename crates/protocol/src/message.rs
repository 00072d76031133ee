use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A wire message, tagged by its `type` field.
///
/// Field names follow the JSON wire format (`apiKey`, `requestId`, …), so a
/// remote agent written in any language can speak the protocol with plain
/// JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Credential handshake sent by a freshly connected remote agent.
    #[serde(rename_all = "camelCase")]
    Auth { api_key: String, cwd: String },

    /// A command the remote agent should run.
    #[serde(rename_all = "camelCase")]
    Execute { request_id: String, command: String },

    /// Outcome of a previously issued `execute`, correlated by `requestId`.
    #[serde(rename_all = "camelCase")]
    CommandResult {
        request_id: String,
        success: bool,
        stdout: String,
        stderr: String,
        exit_code: i32,
    },

    /// Human-readable failure report, optionally with structured details.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
}

impl Message {
    /// Wire name of this message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Auth { .. } => "auth",
            Message::Execute { .. } => "execute",
            Message::CommandResult { .. } => "command_result",
            Message::Error { .. } => "error",
        }
    }
}

/// Decodes a single wire message.
///
/// Fails when the payload is not JSON or when the `type` tag is missing or
/// names no known message kind.
pub fn parse_message(raw: &str) -> Result<Message, ProtocolError> {
    Ok(serde_json::from_str(raw)?)
}

/// Encodes a message for the wire. Total over all four variants.
pub fn serialize_message(message: &Message) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}
