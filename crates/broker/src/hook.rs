//! Post-authentication lifecycle hook.
//!
//! Embedders provide the behavior that should follow a successful remote
//! agent handshake (typically launching or reconfiguring the driving AI
//! process). The broker invokes the hook once per fresh authentication,
//! logs any failure, and never lets it affect the handshake or the server.

use std::future::Future;
use std::pin::Pin;

/// A boxed future returned by hook methods.
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Invoked after a remote agent authenticates.
pub trait AuthHook: Send + Sync + 'static {
    /// Called at most once per successful fresh authentication, with the
    /// working directory the remote agent reported.
    fn on_authenticated(&self, remote_cwd: String) -> HookFuture<'_>;
}

/// Hook that does nothing. Useful for tests and for embedders that only
/// want the command relay.
pub struct NoopHook;

impl AuthHook for NoopHook {
    fn on_authenticated(&self, _remote_cwd: String) -> HookFuture<'_> {
        Box::pin(async { Ok(()) })
    }
}
