//! Driving-CLI subprocess lifecycle.

use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use shellbridge_broker::hook::{AuthHook, HookFuture};

use crate::RunnerError;

/// Launches and supervises the driving CLI.
///
/// The CLI is spawned with an explicit argument list: the configured base
/// arguments plus `--cwd <remote working directory>`. Stdio is inherited so
/// the operator interacts with the CLI directly in the bridge terminal.
pub struct CliRunner {
    program: String,
    base_args: Vec<String>,
    child: Mutex<Option<Child>>,
}

impl CliRunner {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
            child: Mutex::new(None),
        }
    }

    /// Starts the driving CLI for a remote session rooted at `remote_cwd`.
    ///
    /// A previously launched CLI is stopped first, so a re-authenticating
    /// remote agent gets a process pointed at its current working
    /// directory.
    pub async fn start(&self, remote_cwd: &str) -> Result<(), RunnerError> {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(%status, "previous driving process had already exited");
                }
                _ => {
                    info!("stopping driving process before relaunch");
                    let _ = child.kill().await;
                }
            }
            *guard = None;
        }

        info!(program = %self.program, %remote_cwd, "launching driving process");
        let child = Command::new(&self.program)
            .args(&self.base_args)
            .arg("--cwd")
            .arg(remote_cwd)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RunnerError::ProgramNotFound(self.program.clone())
                } else {
                    RunnerError::Io(e)
                }
            })?;
        *guard = Some(child);
        Ok(())
    }

    /// Kills the driving process, if one is live.
    pub async fn stop(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            info!("stopping driving process");
            let _ = child.kill().await;
        }
    }

    /// Whether a driving process is currently alive.
    pub async fn is_running(&self) -> bool {
        let mut guard = self.child.lock().await;
        match guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl AuthHook for CliRunner {
    fn on_authenticated(&self, remote_cwd: String) -> HookFuture<'_> {
        Box::pin(async move {
            // Failures propagate to the broker, which logs them and keeps
            // serving so the operator can fix the CLI and reconnect.
            self.start(&remote_cwd).await?;
            Ok(())
        })
    }
}
