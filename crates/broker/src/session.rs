//! The single active remote agent session.
//!
//! At most one connection holds the session at a time. The working
//! directory lives inside the same `Option` as the connection handle, so it
//! is set exactly when a connection is authenticated and active.

use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite;
use uuid::Uuid;

/// The authenticated connection currently allowed to exchange
/// `execute`/`command_result` traffic.
pub(crate) struct ActiveLink {
    /// Identifies which accepted connection holds the session.
    pub id: Uuid,
    /// Working directory reported by the remote agent at handshake.
    pub cwd: String,
    /// Handle into the connection's write pump.
    pub tx: mpsc::Sender<tungstenite::Message>,
}

pub(crate) struct Session {
    inner: Mutex<Option<ActiveLink>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// Adopts `link` as the active connection, unconditionally replacing
    /// any previous holder. Returns `true` when a holder was replaced; the
    /// replaced connection is neither closed nor notified.
    pub async fn activate(&self, link: ActiveLink) -> bool {
        self.inner.lock().await.replace(link).is_some()
    }

    /// Clears the session, but only if `conn_id` is the current holder.
    /// Returns whether the session was cleared.
    pub async fn clear_for(&self, conn_id: Uuid) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.as_ref().is_some_and(|link| link.id == conn_id) {
            *guard = None;
            true
        } else {
            false
        }
    }

    pub async fn is_active(&self, conn_id: Uuid) -> bool {
        self.inner
            .lock()
            .await
            .as_ref()
            .is_some_and(|link| link.id == conn_id)
    }

    /// Sender for the active connection, if one is authenticated.
    pub async fn command_sender(&self) -> Option<mpsc::Sender<tungstenite::Message>> {
        self.inner.lock().await.as_ref().map(|link| link.tx.clone())
    }

    /// Working directory of the active remote agent.
    pub async fn cwd(&self) -> Option<String> {
        self.inner.lock().await.as_ref().map(|link| link.cwd.clone())
    }
}
