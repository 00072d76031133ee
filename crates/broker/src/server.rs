//! The broker server.
//!
//! Owns the listener, the session, and the pending-command table, all with
//! injected configuration. `run` accepts WebSocket connections until
//! shutdown; `execute_command` is the entry point the driving layer calls
//! to run a command on the connected remote agent.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shellbridge_protocol::constants::COMMAND_TIMEOUT;
use shellbridge_protocol::{Message, serialize_message};

use crate::connection;
use crate::pending::PendingCommands;
use crate::session::Session;
use crate::{AuthHook, BrokerError, CommandOutput};

/// Broker configuration, supplied by the embedding bootstrap layer.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Listening host.
    pub host: String,
    /// Listening port (0 = OS-assigned).
    pub port: u16,
    /// Shared secret a remote agent must present to authenticate.
    pub api_key: String,
    /// Deadline for each issued command.
    pub command_timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            api_key: String::new(),
            command_timeout: COMMAND_TIMEOUT,
        }
    }
}

/// The command broker.
///
/// Accepts any number of sockets, but only the connection that passes the
/// credential handshake becomes the active session commands are relayed to.
pub struct BrokerServer<H: AuthHook> {
    pub(crate) config: BrokerConfig,
    pub(crate) hook: H,
    pub(crate) session: Session,
    pub(crate) pending: PendingCommands,
    pub(crate) cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
}

impl<H: AuthHook> BrokerServer<H> {
    /// Creates a new broker with the given post-auth hook.
    pub fn new(config: BrokerConfig, hook: H) -> Arc<Self> {
        Arc::new(Self {
            config,
            hook,
            session: Session::new(),
            pending: PendingCommands::new(),
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
        })
    }

    /// Returns the bound address. Only available after [`run`](Self::run)
    /// binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns `true` if a remote agent is authenticated and active.
    pub async fn has_active_client(&self) -> bool {
        self.session.command_sender().await.is_some()
    }

    /// Working directory reported by the active remote agent, if any.
    pub async fn remote_cwd(&self) -> Option<String> {
        self.session.cwd().await
    }

    /// The post-auth hook this broker was built with.
    pub fn hook(&self) -> &H {
        &self.hook
    }

    /// Gracefully shuts down the server and all open connections.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the server until cancellation.
    pub async fn run(self: &Arc<Self>) -> Result<(), BrokerError> {
        let listener =
            TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);
        tracing::info!("broker listening on {local_addr}");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("broker shutting down");
                    break Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let server = Arc::clone(self);
                            tokio::spawn(async move {
                                if let Err(e) =
                                    connection::run_connection(server, stream, peer_addr).await
                                {
                                    tracing::warn!(%peer_addr, "connection error: {e}");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }

    /// Runs `command` on the connected remote agent.
    ///
    /// Fails immediately with [`BrokerError::NoActiveClient`] when no agent
    /// is authenticated; nothing is sent and nothing is registered.
    /// Otherwise the command is dispatched with a fresh request identifier
    /// and the call resolves when the matching `command_result` arrives, or
    /// fails with [`BrokerError::Timeout`] at the configured deadline.
    ///
    /// Any number of calls may be outstanding at once; results are matched
    /// by identifier, never by order.
    pub async fn execute_command(&self, command: &str) -> Result<CommandOutput, BrokerError> {
        let tx = self
            .session
            .command_sender()
            .await
            .ok_or(BrokerError::NoActiveClient)?;

        let request_id = Uuid::new_v4().to_string();
        let msg = Message::Execute {
            request_id: request_id.clone(),
            command: command.to_owned(),
        };
        let json = serialize_message(&msg)?;

        let rx = self.pending.register(&request_id).await;
        tracing::debug!(%request_id, "dispatching command to remote agent");

        if tx
            .send(tungstenite::Message::Text(json.into()))
            .await
            .is_err()
        {
            self.pending.discard(&request_id).await;
            return Err(BrokerError::Closed);
        }

        let result = tokio::time::timeout(self.config.command_timeout, rx).await;
        // Clean up the table entry on every exit path.
        self.pending.discard(&request_id).await;

        match result {
            Ok(Ok(reply)) if reply.success => Ok(CommandOutput {
                stdout: reply.stdout,
                stderr: reply.stderr,
                exit_code: reply.exit_code,
            }),
            Ok(Ok(reply)) => Err(BrokerError::CommandFailed(if reply.stderr.is_empty() {
                "Command failed".into()
            } else {
                reply.stderr
            })),
            Ok(Err(_)) => Err(BrokerError::Closed),
            Err(_) => Err(BrokerError::Timeout),
        }
    }
}
