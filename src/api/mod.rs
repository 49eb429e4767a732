//! HTTP surface of the gateway.

pub mod compat;
pub mod forward;
pub mod models;

use std::sync::Arc;

use axum::Router;

use crate::AppState;

/// Build the full router: the OpenAI-style `/v1` surface plus the
/// Ollama-compat endpoints at the root.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .nest(
            "/v1",
            Router::new()
                .merge(models::router())
                .merge(forward::router()),
        )
        .merge(compat::router())
}
