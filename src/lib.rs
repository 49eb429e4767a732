//! llamagate - single-slot gateway that lazily starts llama-server backends.
//!
//! Inbound requests name a model; the gateway keeps at most one backend
//! process alive, starting, swapping or expiring it as traffic dictates, and
//! streams request/response bodies straight through.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod manager;
pub mod probe;
pub mod process;
pub mod proxy;
pub mod runner;
pub mod test_util;

pub use catalog::{Catalog, Endpoint, ExecSpec, FlagValue, LaunchConfig};
pub use config::{Config, LifecycleConfig, ProbeKind};
pub use error::{Error, Result};
pub use manager::RunnerManager;
pub use runner::{Runner, RunnerState};

use std::sync::Arc;

/// Shared application state passed to all handlers.
pub struct AppState {
    pub config: Config,
    pub catalog: Catalog,
    pub manager: Arc<RunnerManager>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, catalog: Catalog, manager: Arc<RunnerManager>) -> Self {
        Self {
            config,
            catalog,
            manager,
            http: reqwest::Client::new(),
        }
    }
}
