//! Driving-process integration for shellbridge.
//!
//! Once a remote agent authenticates, something has to actually drive
//! commands through the broker: an AI coding CLI on the bridge host.
//! [`CliRunner`] launches that CLI as an explicit subprocess and restarts
//! it when a new remote session arrives; [`toolspec`] rewrites an AI API
//! request body so the model reaches for the remote shell instead of the
//! local filesystem tools.

mod process;
pub mod toolspec;

pub use process::CliRunner;
pub use toolspec::{RequestInterceptor, ShellToolInterceptor};

/// Errors produced when managing the driving process.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured program is not installed or not on PATH.
    #[error("`{0}` not found in PATH")]
    ProgramNotFound(String),
}
