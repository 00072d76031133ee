//! Wire protocol types for shellbridge.
//!
//! All traffic between the bridge and a remote agent is JSON text frames
//! over WebSocket. Every frame carries a `type` discriminator; [`Message`]
//! models the four message kinds and [`parse_message`]/[`serialize_message`]
//! are the only codec entry points.

pub mod constants;
mod message;

pub use message::{Message, parse_message, serialize_message};

/// Errors produced by the codec.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The payload was not valid JSON, or lacked a usable `type` tag.
    #[error("invalid message format: {0}")]
    Format(#[from] serde_json::Error),
}
