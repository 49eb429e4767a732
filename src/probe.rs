//! Readiness probes.
//!
//! llama-server exposes no startup handshake the gateway can rely on across
//! versions, so readiness is inferred by probing the configured endpoint. The
//! strategy is pluggable: a plain TCP connect works for any backend, the HTTP
//! probe uses the health endpoint of backends that have one.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::catalog::Endpoint;
use crate::config::{LifecycleConfig, ProbeKind};

const TCP_CONNECT_TIMEOUT_MS: u64 = 500;
const HTTP_PROBE_TIMEOUT_MS: u64 = 1000;

/// Decides whether a backend is ready to accept traffic.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn is_ready(&self, endpoint: &Endpoint) -> bool;
}

/// Probe that attempts a TCP connection to the backend port.
pub struct TcpProbe {
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_millis(TCP_CONNECT_TIMEOUT_MS),
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadinessProbe for TcpProbe {
    async fn is_ready(&self, endpoint: &Endpoint) -> bool {
        let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        matches!(
            tokio::time::timeout(self.connect_timeout, connect).await,
            Ok(Ok(_))
        )
    }
}

/// Probe that GETs a health endpoint on the backend.
pub struct HttpProbe {
    client: reqwest::Client,
    path: String,
}

impl HttpProbe {
    pub fn new(path: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl ReadinessProbe for HttpProbe {
    async fn is_ready(&self, endpoint: &Endpoint) -> bool {
        let url = format!("http://{}{}", endpoint, self.path);
        let request = self.client.get(&url).send();
        match tokio::time::timeout(Duration::from_millis(HTTP_PROBE_TIMEOUT_MS), request).await {
            Ok(Ok(response)) => response.status().is_success(),
            _ => false,
        }
    }
}

/// Build the probe selected by configuration.
pub fn from_config(lifecycle: &LifecycleConfig) -> Arc<dyn ReadinessProbe> {
    match lifecycle.probe {
        ProbeKind::Tcp => Arc::new(TcpProbe::new()),
        ProbeKind::Http => Arc::new(HttpProbe::new(&lifecycle.probe_path)),
    }
}
