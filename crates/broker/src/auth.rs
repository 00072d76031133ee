//! Credential handshake for freshly connected remote agents.

use std::sync::Arc;

use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::connection::{ConnHandle, send_error};
use crate::server::BrokerServer;
use crate::session::ActiveLink;
use crate::AuthHook;

/// Handles an inbound `auth` message.
///
/// A mismatched credential gets an `error` reply and a forced close, and
/// leaves any existing session untouched. A match adopts this connection as
/// the active session (replacing a previous holder without notice) and
/// fires the post-auth hook once. Hook failures are logged and never fail
/// the handshake.
pub(crate) async fn handle_auth<H: AuthHook>(
    server: &Arc<BrokerServer<H>>,
    conn: &ConnHandle,
    cancel: &CancellationToken,
    api_key: &str,
    cwd: String,
) {
    if api_key != server.config.api_key {
        warn!("authentication failed");
        send_error(&conn.tx, "Authentication failed", None).await;
        let _ = conn.tx.send(tungstenite::Message::Close(None)).await;
        cancel.cancel();
        return;
    }

    let link = ActiveLink {
        id: conn.id,
        cwd: cwd.clone(),
        tx: conn.tx.clone(),
    };
    if server.session.activate(link).await {
        info!(%cwd, "remote agent authenticated, replacing active session");
    } else {
        info!(%cwd, "remote agent authenticated");
    }

    if let Err(e) = server.hook.on_authenticated(cwd).await {
        error!("post-auth hook failed: {e:#}");
    }
}
