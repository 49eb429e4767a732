//! Model catalog: maps a model id to the launch configuration of its backend.
//!
//! The catalog is read-only to the lifecycle core. Each entry describes how to
//! start a llama-server process for one model and where it will listen once
//! ready.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

/// A single command-line argument value in a launch configuration.
///
/// `true` booleans render as bare flags, `false` booleans are omitted, and
/// everything else renders as a `--key value` pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(value) => write!(f, "{value}"),
            FlagValue::Int(value) => write!(f, "{value}"),
            FlagValue::Float(value) => write!(f, "{value}"),
            FlagValue::Text(value) => write!(f, "{value}"),
        }
    }
}

/// What to execute: either a bare binary name/path or a full command prefix
/// (wrapper plus binary, e.g. `["toolbox", "run", "llama-server"]`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExecSpec {
    Binary(String),
    CommandLine(Vec<String>),
}

impl ExecSpec {
    fn tokens(&self) -> &[String] {
        match self {
            ExecSpec::Binary(binary) => std::slice::from_ref(binary),
            ExecSpec::CommandLine(tokens) => tokens,
        }
    }
}

impl Default for ExecSpec {
    fn default() -> Self {
        ExecSpec::Binary("llama-server".to_string())
    }
}

/// Host and port a backend listens on once ready. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Launch configuration for one model's backend process.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    /// What to launch (default: "llama-server").
    #[serde(default)]
    pub exec: ExecSpec,
    /// Host the backend binds to.
    #[serde(default = "default_backend_host")]
    pub host: String,
    /// Port the backend binds to.
    #[serde(default = "default_backend_port")]
    pub port: u16,
    /// Remaining per-model flags, passed through as `--key value` pairs.
    #[serde(flatten, default)]
    pub args: HashMap<String, FlagValue>,
}

fn default_backend_host() -> String {
    "localhost".to_string()
}
fn default_backend_port() -> u16 {
    8080
}

impl LaunchConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: self.host.clone(),
            port: self.port,
        }
    }

    /// Render the full argv for this backend, exec tokens first.
    ///
    /// Host and port are passed through to the backend so it binds exactly
    /// where the gateway expects it. Flags are emitted in sorted order so the
    /// command line is deterministic.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = self.exec.tokens().to_vec();
        argv.extend([
            "--host".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
        ]);

        let mut keys: Vec<&String> = self.args.keys().collect();
        keys.sort();

        for key in keys {
            match &self.args[key] {
                FlagValue::Bool(true) => argv.push(format!("--{key}")),
                FlagValue::Bool(false) => {}
                value => {
                    argv.push(format!("--{key}"));
                    argv.push(value.to_string());
                }
            }
        }

        argv
    }
}

/// The set of models this gateway can serve.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    models: HashMap<String, LaunchConfig>,
}

impl Catalog {
    pub fn new(models: HashMap<String, LaunchConfig>) -> Self {
        Self { models }
    }

    pub fn get(&self, model_id: &str) -> Option<&LaunchConfig> {
        self.models.get(model_id)
    }

    /// All known model ids, sorted for consistent listings.
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.models.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
