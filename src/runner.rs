//! Runner: the managed wrapper around one backend process instance.
//!
//! A Runner owns its process for the whole lifetime: it is the only entity
//! allowed to terminate it, and it does so at most once. Idle expiry is a
//! single re-armed timer per Runner, precise to the scheduler's resolution,
//! not an interval poll.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::{self, Instant};

use crate::catalog::{Endpoint, LaunchConfig};
use crate::config::LifecycleConfig;
use crate::error::{Error, Result};
use crate::probe::ReadinessProbe;
use crate::process::{ProcessControl, ProcessHandle};

/// State of a backend process. `Exited` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// Process spawned, port not yet open.
    Starting,
    /// Backend confirmed listening on its configured port.
    Ready,
    /// Process terminated or observed dead. Never reused.
    Exited,
}

/// One backend process: its endpoint, readiness state and idle deadline.
pub struct Runner {
    model_id: String,
    endpoint: Endpoint,
    lifecycle: LifecycleConfig,
    probe: Arc<dyn ReadinessProbe>,
    process: Mutex<Option<Box<dyn ProcessHandle>>>,
    state: RwLock<RunnerState>,
    /// Absolute idle deadline; pushed forward on every keepalive.
    deadline: watch::Sender<Instant>,
    /// Flipped to true once termination has fully completed.
    done: watch::Sender<bool>,
    /// Guards the terminate-at-most-once invariant.
    terminated: Mutex<bool>,
}

impl Runner {
    /// Spawn the backend process for `model_id` and arm the idle-expiry timer
    /// at `now + idle_timeout`.
    pub async fn spawn(
        model_id: &str,
        launch: &LaunchConfig,
        control: &dyn ProcessControl,
        probe: Arc<dyn ReadinessProbe>,
        lifecycle: LifecycleConfig,
    ) -> Result<Arc<Self>> {
        let argv = launch.command_line();
        let handle = control.spawn(&argv).await?;

        let (deadline, _) = watch::channel(Instant::now() + lifecycle.idle_timeout());
        let (done, _) = watch::channel(false);

        let runner = Arc::new(Self {
            model_id: model_id.to_string(),
            endpoint: launch.endpoint(),
            lifecycle,
            probe,
            process: Mutex::new(Some(handle)),
            state: RwLock::new(RunnerState::Starting),
            deadline,
            done,
            terminated: Mutex::new(false),
        });

        runner.arm_expiry();

        tracing::info!(
            model = %runner.model_id,
            endpoint = %runner.endpoint,
            "spawned runner"
        );

        Ok(runner)
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn state(&self) -> RunnerState {
        *self.state.read().await
    }

    /// The absolute deadline at which idle expiry will fire.
    pub fn expires_at(&self) -> Instant {
        *self.deadline.borrow()
    }

    /// Push the idle deadline forward to `now + idle_timeout`.
    ///
    /// Must be called on every successful dispatch while this Runner is the
    /// active one. The pending expiry is replaced, never stacked.
    pub fn keepalive(&self) {
        self.deadline
            .send_replace(Instant::now() + self.lifecycle.idle_timeout());
    }

    /// Poll until the backend is ready to accept traffic.
    ///
    /// Resolves `Ok(true)` once the probe confirms the port is open,
    /// `Ok(false)` the instant the process is observed exited, and
    /// `Err(ReadinessTimeout)` if the port never opens within the bounded
    /// startup window. Safe to call again on an already-ready Runner to
    /// re-check it before reuse.
    pub async fn wait_ready(&self) -> Result<bool> {
        let started = Instant::now();

        loop {
            if !self.process_alive().await {
                *self.state.write().await = RunnerState::Exited;
                return Ok(false);
            }

            if self.probe.is_ready(&self.endpoint).await {
                let mut state = self.state.write().await;
                if *state == RunnerState::Starting {
                    tracing::info!(
                        model = %self.model_id,
                        endpoint = %self.endpoint,
                        elapsed = ?started.elapsed(),
                        "runner ready"
                    );
                    *state = RunnerState::Ready;
                }
                return Ok(true);
            }

            if started.elapsed() >= self.lifecycle.startup_timeout() {
                return Err(Error::ReadinessTimeout(format!(
                    "backend for {} did not open {} within {:?}",
                    self.model_id,
                    self.endpoint,
                    self.lifecycle.startup_timeout()
                )));
            }

            time::sleep(self.lifecycle.poll_interval()).await;
        }
    }

    /// Terminate the backend process. Idempotent; concurrent callers wait for
    /// the first termination to complete.
    pub async fn terminate(&self) {
        let mut terminated = self.terminated.lock().await;
        if *terminated {
            return;
        }
        *terminated = true;

        *self.state.write().await = RunnerState::Exited;

        if let Some(mut handle) = self.process.lock().await.take() {
            tracing::info!(model = %self.model_id, "stopping runner");
            handle.terminate(self.lifecycle.shutdown_grace()).await;
        }

        // Signalled only after the process is fully down, so waiters never
        // observe a half-terminated runner.
        self.done.send_replace(true);
    }

    /// Resolves once this Runner has fully terminated.
    pub async fn closed(&self) {
        let mut rx = self.done.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    async fn process_alive(&self) -> bool {
        match self.process.lock().await.as_mut() {
            Some(handle) => handle.is_running().await,
            None => false,
        }
    }

    /// Single-timer idle expiry: sleep until the deadline, terminate if it
    /// still lies in the past, otherwise re-arm at the new deadline.
    fn arm_expiry(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let mut deadline_rx = self.deadline.subscribe();
        let mut done_rx = self.done.subscribe();

        tokio::spawn(async move {
            loop {
                let at = *deadline_rx.borrow_and_update();
                tokio::select! {
                    _ = time::sleep_until(at) => {
                        let Some(runner) = weak.upgrade() else { return };
                        if *runner.deadline.borrow() <= Instant::now() {
                            tracing::info!(model = %runner.model_id, "idle timeout expired");
                            runner.terminate().await;
                            return;
                        }
                        // keepalive raced the timer; loop re-arms at the new deadline
                    }
                    changed = deadline_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = done_rx.changed() => return,
                }
            }
        });
    }
}
