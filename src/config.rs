//! Configuration for the gateway.

use std::collections::HashMap;
use std::time::Duration;

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::catalog::LaunchConfig;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Per-model backend launch configurations.
    #[serde(default)]
    pub models: HashMap<String, LaunchConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which readiness probe to run against a starting backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// TCP connect to the backend port (default).
    #[default]
    Tcp,
    /// GET a health endpoint on the backend.
    Http,
}

/// Runner lifecycle timings and probing.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Idle time before the active runner is terminated (default: 300).
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Maximum time to wait for a backend to open its port (default: 120).
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
    /// Readiness poll cadence in milliseconds (default: 1000).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// SIGTERM-to-kill grace window in seconds (default: 10).
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    /// Readiness probe strategy.
    #[serde(default)]
    pub probe: ProbeKind,
    /// Path probed by the HTTP readiness probe.
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    /// Inherit backend stdout/stderr for debugging (default: false).
    #[serde(default)]
    pub log_backend_output: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            startup_timeout_secs: default_startup_timeout(),
            poll_interval_ms: default_poll_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
            probe: ProbeKind::default(),
            probe_path: default_probe_path(),
            log_backend_output: false,
        }
    }
}

impl LifecycleConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8765
}
fn default_idle_timeout() -> u64 {
    300
}
fn default_startup_timeout() -> u64 {
    120
}
fn default_poll_interval() -> u64 {
    1000
}
fn default_shutdown_grace() -> u64 {
    10
}
fn default_probe_path() -> String {
    "/health".to_string()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (LLAMAGATE__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("LLAMAGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
