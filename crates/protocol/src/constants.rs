//! Protocol-wide constants shared by the bridge and embedders.

use std::time::Duration;

/// How long the bridge waits for a `command_result` before failing the
/// corresponding command.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum accepted WebSocket message size. Command output travels as a
/// single text frame, so this bounds stdout/stderr capture per command.
pub const WS_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
