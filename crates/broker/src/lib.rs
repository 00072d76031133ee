//! Command broker for shellbridge.
//!
//! Listens for a remote agent over WebSocket, authenticates it against a
//! shared secret, and relays `execute` requests from in-process callers to
//! the single active agent. Replies are correlated back to their callers by
//! request identifier, so any number of commands may be in flight over the
//! one connection; an unanswered command fails after a configurable
//! deadline.

mod auth;
mod connection;
pub mod hook;
mod pending;
mod server;
mod session;

pub use hook::{AuthHook, HookFuture, NoopHook};
pub use server::{BrokerConfig, BrokerServer};

/// Per-connection send buffer capacity.
///
/// Outbound traffic is one `execute` frame per in-flight command plus the
/// occasional `error` reply, so a modest buffer never saturates.
pub const SEND_BUFFER_SIZE: usize = 256;

/// Resolved output of a successfully executed remote command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Errors produced by the broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] shellbridge_protocol::ProtocolError),

    /// `execute_command` was called while no remote agent is authenticated.
    #[error("no remote agent connected")]
    NoActiveClient,

    /// No `command_result` arrived within the configured deadline.
    #[error("command timed out")]
    Timeout,

    /// The connection went away before the command could be settled.
    #[error("connection closed")]
    Closed,

    /// The remote agent ran the command and reported failure. Carries the
    /// remote-supplied stderr, or a generic text when stderr was empty.
    #[error("{0}")]
    CommandFailed(String),
}
