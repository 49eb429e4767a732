//! Fakes for the process-control and readiness-probe boundaries, shared by
//! unit and integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::catalog::{Catalog, Endpoint, ExecSpec, FlagValue, LaunchConfig};
use crate::config::LifecycleConfig;
use crate::error::{Error, Result};
use crate::probe::ReadinessProbe;
use crate::process::{ProcessControl, ProcessHandle};

/// Observable state of one fake process.
pub struct FakeProcessState {
    running: AtomicBool,
    terminations: AtomicUsize,
}

impl FakeProcessState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// How many times `terminate` was called on this process.
    pub fn terminate_count(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

struct FakeHandle {
    state: Arc<FakeProcessState>,
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn id(&self) -> Option<u32> {
        Some(0)
    }

    async fn is_running(&mut self) -> bool {
        self.state.is_running()
    }

    async fn terminate(&mut self, _grace: Duration) {
        self.state.running.store(false, Ordering::SeqCst);
        self.state.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

/// [`ProcessControl`] that records every spawn and never touches the OS.
pub struct FakeProcessControl {
    spawned: Mutex<Vec<(Vec<String>, Arc<FakeProcessState>)>>,
    fail_spawn: AtomicBool,
    exit_after_spawn: AtomicBool,
    peak_running: AtomicUsize,
}

impl FakeProcessControl {
    pub fn new() -> Self {
        Self {
            spawned: Mutex::new(Vec::new()),
            fail_spawn: AtomicBool::new(false),
            exit_after_spawn: AtomicBool::new(false),
            peak_running: AtomicUsize::new(0),
        }
    }

    /// Make subsequent spawns fail with [`Error::Spawn`].
    pub fn fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Make subsequently spawned processes exit immediately.
    pub fn exit_after_spawn(&self, exit: bool) {
        self.exit_after_spawn.store(exit, Ordering::SeqCst);
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    /// The argv the n-th spawn was called with.
    pub fn argv(&self, index: usize) -> Vec<String> {
        self.spawned.lock().unwrap()[index].0.clone()
    }

    /// State of the n-th spawned process.
    pub fn process(&self, index: usize) -> Arc<FakeProcessState> {
        self.spawned.lock().unwrap()[index].1.clone()
    }

    /// Simulate the n-th process dying on its own (no terminate recorded).
    pub fn kill(&self, index: usize) {
        self.process(index).running.store(false, Ordering::SeqCst);
    }

    pub fn running_count(&self) -> usize {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, state)| state.is_running())
            .count()
    }

    /// Highest number of simultaneously running processes ever observed at a
    /// spawn. A second live process can only appear at a spawn, so a peak of
    /// one proves the single-slot invariant held.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

impl Default for FakeProcessControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessControl for FakeProcessControl {
    async fn spawn(&self, argv: &[String]) -> Result<Box<dyn ProcessHandle>> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(Error::Spawn("fake spawn failure".to_string()));
        }

        let state = Arc::new(FakeProcessState {
            running: AtomicBool::new(!self.exit_after_spawn.load(Ordering::SeqCst)),
            terminations: AtomicUsize::new(0),
        });

        let mut spawned = self.spawned.lock().unwrap();
        spawned.push((argv.to_vec(), state.clone()));
        let running = spawned
            .iter()
            .filter(|(_, state)| state.is_running())
            .count();
        self.peak_running.fetch_max(running, Ordering::SeqCst);

        Ok(Box::new(FakeHandle { state }))
    }
}

/// [`ReadinessProbe`] that reports ready from a configured instant onwards.
pub struct FakeProbe {
    ready_at: Mutex<Option<Instant>>,
}

impl FakeProbe {
    /// Never reports ready.
    pub fn never() -> Self {
        Self {
            ready_at: Mutex::new(None),
        }
    }

    /// Ready from the moment of creation.
    pub fn ready_now() -> Self {
        Self {
            ready_at: Mutex::new(Some(Instant::now())),
        }
    }

    /// Ready once the (possibly paused) clock reaches `at`.
    pub fn ready_at(at: Instant) -> Self {
        Self {
            ready_at: Mutex::new(Some(at)),
        }
    }

    pub fn set_ready(&self) {
        *self.ready_at.lock().unwrap() = Some(Instant::now());
    }
}

#[async_trait]
impl ReadinessProbe for FakeProbe {
    async fn is_ready(&self, _endpoint: &Endpoint) -> bool {
        self.ready_at
            .lock()
            .unwrap()
            .is_some_and(|at| Instant::now() >= at)
    }
}

/// A launch config pointing at localhost with one model flag.
pub fn test_launch_config(port: u16) -> LaunchConfig {
    LaunchConfig {
        exec: ExecSpec::default(),
        host: "127.0.0.1".to_string(),
        port,
        args: HashMap::from([(
            "model".to_string(),
            FlagValue::Text("/models/test.gguf".to_string()),
        )]),
    }
}

/// Catalog with `model-a` and `model-b` on distinct ports.
pub fn test_catalog() -> Catalog {
    Catalog::new(HashMap::from([
        ("model-a".to_string(), test_launch_config(9101)),
        ("model-b".to_string(), test_launch_config(9102)),
    ]))
}

/// Short timings so lifecycle tests stay fast under a paused clock.
pub fn test_lifecycle() -> LifecycleConfig {
    LifecycleConfig {
        idle_timeout_secs: 5,
        startup_timeout_secs: 30,
        poll_interval_ms: 1000,
        shutdown_grace_secs: 1,
        ..LifecycleConfig::default()
    }
}
