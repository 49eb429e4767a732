//! Process control boundary.
//!
//! The runner needs exactly three things from the operating system: start a
//! process, check whether it is still running, and terminate it. Keeping that
//! surface behind a trait lets the lifecycle tests run without spawning real
//! llama-server processes.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::error::{Error, Result};

/// Ownership of exactly one OS process.
#[async_trait]
pub trait ProcessHandle: Send {
    /// OS pid, if the process has not already been reaped.
    fn id(&self) -> Option<u32>;

    /// Whether the process is still running.
    async fn is_running(&mut self) -> bool;

    /// Graceful termination: SIGTERM, wait up to `grace`, then kill.
    async fn terminate(&mut self, grace: Duration);
}

/// Spawns backend processes.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Spawn `argv` (binary first). Fails with [`Error::Spawn`] if the
    /// executable cannot be launched.
    async fn spawn(&self, argv: &[String]) -> Result<Box<dyn ProcessHandle>>;
}

/// Production [`ProcessControl`] backed by `tokio::process`.
pub struct TokioProcessControl {
    log_backend_output: bool,
}

impl TokioProcessControl {
    pub fn new(log_backend_output: bool) -> Self {
        Self { log_backend_output }
    }
}

#[async_trait]
impl ProcessControl for TokioProcessControl {
    async fn spawn(&self, argv: &[String]) -> Result<Box<dyn ProcessHandle>> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Spawn("empty command line".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        if self.log_backend_output {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let child = cmd
            .spawn()
            .map_err(|e| Error::Spawn(format!("failed to spawn {program}: {e}")))?;

        tracing::info!(program = %program, pid = ?child.id(), "spawned backend process");

        Ok(Box::new(ChildHandle { child }))
    }
}

struct ChildHandle {
    child: Child,
}

#[async_trait]
impl ProcessHandle for ChildHandle {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn terminate(&mut self, grace: Duration) {
        // Try SIGTERM first on Unix
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(status = %status, "backend process exited");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "error waiting for backend process");
            }
            Err(_timeout) => {
                tracing::warn!("backend process didn't stop gracefully, killing");
                let _ = self.child.kill().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let control = TokioProcessControl::new(false);
        let result = control
            .spawn(&["/nonexistent/llama-server".to_string()])
            .await;
        assert!(matches!(result, Err(Error::Spawn(_))));
    }

    #[tokio::test]
    async fn test_spawn_empty_argv() {
        let control = TokioProcessControl::new(false);
        let result = control.spawn(&[]).await;
        assert!(matches!(result, Err(Error::Spawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_and_terminate() {
        let control = TokioProcessControl::new(false);
        let mut handle = control
            .spawn(&["sleep".to_string(), "60".to_string()])
            .await
            .unwrap();

        assert!(handle.is_running().await);
        handle.terminate(Duration::from_secs(5)).await;
        assert!(!handle.is_running().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_is_running_after_exit() {
        let control = TokioProcessControl::new(false);
        let mut handle = control.spawn(&["true".to_string()]).await.unwrap();

        // Give the process a moment to exit on its own
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_running().await);
    }
}
