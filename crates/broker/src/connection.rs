//! Per-connection lifecycle: WebSocket upgrade, read loop, write pump.
//!
//! A connection moves through `Connected` → `Authenticated` → `Closed`.
//! Every accepted socket gets a read loop here; only the one that passes
//! the credential handshake graduates to holding the session. On close the
//! session is cleared if this connection held it; in-flight commands are
//! left to reach their own deadlines.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async_with_config, tungstenite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shellbridge_protocol::constants::WS_MAX_MESSAGE_SIZE;
use shellbridge_protocol::{Message, parse_message, serialize_message};

use crate::pending::CommandReply;
use crate::server::BrokerServer;
use crate::{AuthHook, BrokerError, SEND_BUFFER_SIZE};

/// Write-side handle for one accepted connection.
pub(crate) struct ConnHandle {
    pub id: Uuid,
    pub tx: mpsc::Sender<tungstenite::Message>,
}

/// Upgrades an accepted TCP stream and drives it until close.
pub(crate) async fn run_connection<H: AuthHook>(
    server: Arc<BrokerServer<H>>,
    stream: TcpStream,
    peer_addr: SocketAddr,
) -> Result<(), BrokerError> {
    let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
    ws_config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
    ws_config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
    let ws_stream = accept_async_with_config(stream, Some(ws_config)).await?;
    info!(%peer_addr, "remote agent connected");

    let (write, mut read) = ws_stream.split();
    let (write_tx, write_rx) = mpsc::channel(SEND_BUFFER_SIZE);
    let cancel = server.cancel.child_token();
    let write_task = tokio::spawn(write_pump(write, write_rx, cancel.clone()));

    let conn = ConnHandle {
        id: Uuid::new_v4(),
        tx: write_tx,
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = read.next() => {
                match msg {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        dispatch(&server, &conn, &cancel, &text).await;
                    }
                    Some(Ok(tungstenite::Message::Close(_))) => {
                        debug!(%peer_addr, "received close frame");
                        break;
                    }
                    // Ping/pong are handled by the transport; binary frames
                    // have no meaning in this protocol.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(%peer_addr, "WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!(%peer_addr, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    if server.session.clear_for(conn.id).await {
        info!(%peer_addr, "active remote agent disconnected");
    } else {
        debug!(%peer_addr, "connection closed");
    }

    cancel.cancel();
    let _ = write_task.await;
    Ok(())
}

/// Routes one inbound text frame by message type.
async fn dispatch<H: AuthHook>(
    server: &Arc<BrokerServer<H>>,
    conn: &ConnHandle,
    cancel: &CancellationToken,
    text: &str,
) {
    match parse_message(text) {
        Ok(Message::Auth { api_key, cwd }) => {
            crate::auth::handle_auth(server, conn, cancel, &api_key, cwd).await;
        }
        Ok(Message::CommandResult {
            request_id,
            success,
            stdout,
            stderr,
            exit_code,
        }) => {
            // Results only count from the connection currently holding the
            // session; a replaced connection can no longer settle commands.
            if !server.session.is_active(conn.id).await {
                warn!(%request_id, "command result from non-active connection, dropping");
                return;
            }
            let reply = CommandReply {
                success,
                stdout,
                stderr,
                exit_code,
            };
            server.pending.settle(&request_id, reply).await;
        }
        Ok(other) => {
            warn!(r#type = other.kind(), "unhandled message type, dropping");
        }
        Err(e) => {
            warn!("failed to parse message: {e}");
            send_error(&conn.tx, "Invalid message format", None).await;
        }
    }
}

/// Queues an `error` message on a connection. Best-effort: a full or
/// closed write pump drops it.
pub(crate) async fn send_error(
    tx: &mpsc::Sender<tungstenite::Message>,
    message: &str,
    details: Option<serde_json::Value>,
) {
    let msg = Message::Error {
        message: message.to_owned(),
        details,
    };
    if let Ok(json) = serialize_message(&msg) {
        let _ = tx.send(tungstenite::Message::Text(json.into())).await;
    }
}

/// Writes queued frames to the WebSocket until cancellation.
async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        tokio::select! {
            // Drain queued frames before honoring cancellation, so a
            // rejection reply still reaches the peer we are closing on.
            biased;

            msg = write_rx.recv() => {
                match msg {
                    Some(m) => {
                        if let Err(e) = write.send(m).await {
                            debug!("WebSocket write error: {e}");
                            break;
                        }
                    }
                    None => break,
                }
            }

            _ = cancel.cancelled() => break,
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}
