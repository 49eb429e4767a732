//! Runner manager: the single active slot.
//!
//! At most one backend process exists under this manager at any time. The
//! slot trades concurrency for the resource exclusivity of the compute device
//! the backend claims: two llama-server processes on one GPU would either
//! fail to bind or contend destructively, so any model mismatch forces a full
//! terminate-then-restart swap.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::catalog::{Catalog, Endpoint};
use crate::config::LifecycleConfig;
use crate::error::{Error, Result};
use crate::probe::ReadinessProbe;
use crate::process::ProcessControl;
use crate::runner::Runner;

pub struct RunnerManager {
    catalog: Catalog,
    control: Arc<dyn ProcessControl>,
    probe: Arc<dyn ReadinessProbe>,
    lifecycle: LifecycleConfig,
    /// The single active slot. All mutation happens under this lock, so a
    /// racing pair of requests can never produce two ready runners.
    active: Mutex<Option<Arc<Runner>>>,
}

impl RunnerManager {
    pub fn new(
        catalog: Catalog,
        control: Arc<dyn ProcessControl>,
        probe: Arc<dyn ReadinessProbe>,
        lifecycle: LifecycleConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            control,
            probe,
            lifecycle,
            active: Mutex::new(None),
        })
    }

    /// Ensure a ready runner for `model` exists and return its endpoint.
    ///
    /// Reuses the active runner when the model matches and it still checks
    /// out as ready; otherwise terminates the incumbent and spawns a fresh
    /// one. The idle deadline is refreshed on every successful resolve.
    pub async fn resolve(self: &Arc<Self>, model: &str) -> Result<Endpoint> {
        let mut slot = self.active.lock().await;

        if let Some(current) = slot.clone() {
            if current.model_id() == model {
                // Re-check readiness: the process could have died since the
                // last request.
                match current.wait_ready().await {
                    Ok(true) => {
                        current.keepalive();
                        return Ok(current.endpoint().clone());
                    }
                    Ok(false) => {
                        tracing::warn!(model, "active runner exited unexpectedly, respawning");
                    }
                    Err(e) => {
                        tracing::warn!(model, error = %e, "active runner unresponsive, respawning");
                    }
                }
            } else {
                tracing::info!(
                    from = %current.model_id(),
                    to = %model,
                    "swapping active runner"
                );
            }

            current.terminate().await;
            *slot = None;
        }

        let launch = self
            .catalog
            .get(model)
            .ok_or_else(|| Error::ModelNotFound(model.to_string()))?;

        let runner = Runner::spawn(
            model,
            launch,
            self.control.as_ref(),
            self.probe.clone(),
            self.lifecycle.clone(),
        )
        .await?;

        match runner.wait_ready().await {
            Ok(true) => {}
            Ok(false) => {
                runner.terminate().await;
                return Err(Error::BackendUnavailable(format!(
                    "backend for {model} exited before opening {}",
                    runner.endpoint()
                )));
            }
            Err(e) => {
                runner.terminate().await;
                return Err(e);
            }
        }

        runner.keepalive();
        *slot = Some(runner.clone());
        self.reap_on_close(runner.clone());

        Ok(runner.endpoint().clone())
    }

    /// The runner currently holding the slot, if any.
    pub async fn active_runner(&self) -> Option<Arc<Runner>> {
        self.active.lock().await.clone()
    }

    /// The model served by the active runner, if any.
    pub async fn active_model(&self) -> Option<String> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|runner| runner.model_id().to_string())
    }

    /// Terminate the active runner, if any. Called on gateway shutdown.
    pub async fn shutdown(&self) {
        let runner = self.active.lock().await.take();
        if let Some(runner) = runner {
            runner.terminate().await;
        }
    }

    /// Empty the slot once the stored runner terminates (idle expiry or
    /// unexpected death handled elsewhere), so an expired runner does not
    /// linger as "active".
    fn reap_on_close(self: &Arc<Self>, runner: Arc<Runner>) {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            runner.closed().await;
            if let Some(manager) = manager.upgrade() {
                let mut slot = manager.active.lock().await;
                if slot
                    .as_ref()
                    .is_some_and(|active| Arc::ptr_eq(active, &runner))
                {
                    *slot = None;
                }
            }
        });
    }
}
