//! In-flight command table.
//!
//! Each issued command registers a one-shot settlement channel keyed by its
//! request identifier. `command_result` frames settle entries by identifier
//! only; arrival order carries no meaning. Late or unknown identifiers are
//! tolerated silently: at-most-once settlement is the table's contract.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::{Mutex, oneshot};
use tracing::trace;

/// Parsed payload of a `command_result` frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandReply {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

struct PendingEntry {
    tx: oneshot::Sender<CommandReply>,
    issued_at: Instant,
}

/// Table of commands awaiting a result from the remote agent.
pub(crate) struct PendingCommands {
    inner: Mutex<HashMap<String, PendingEntry>>,
}

impl PendingCommands {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a fresh request identifier and returns the receiving end
    /// of its settlement channel.
    pub async fn register(&self, request_id: &str) -> oneshot::Receiver<CommandReply> {
        let (tx, rx) = oneshot::channel();
        let entry = PendingEntry {
            tx,
            issued_at: Instant::now(),
        };
        self.inner.lock().await.insert(request_id.to_owned(), entry);
        rx
    }

    /// Settles the entry for `request_id`, if one is still registered.
    ///
    /// Returns `false` for unknown or already-settled identifiers; those
    /// results are dropped without further effect.
    pub async fn settle(&self, request_id: &str, reply: CommandReply) -> bool {
        let entry = self.inner.lock().await.remove(request_id);
        match entry {
            Some(entry) => {
                trace!(
                    %request_id,
                    elapsed_ms = entry.issued_at.elapsed().as_millis() as u64,
                    "settling command"
                );
                // The caller may have given up at its deadline already.
                let _ = entry.tx.send(reply);
                true
            }
            None => {
                trace!(%request_id, "result for unknown request, dropping");
                false
            }
        }
    }

    /// Removes an entry without settling it. Callers run this on every exit
    /// path so abandoned commands don't accumulate.
    pub async fn discard(&self, request_id: &str) {
        self.inner.lock().await.remove(request_id);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
