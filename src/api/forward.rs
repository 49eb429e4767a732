//! Catch-all `/v1/{tail}` forwarding endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::Response;
use axum::routing::any;
use axum::Router;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::proxy;
use crate::AppState;

/// Upper bound on the inbound body we buffer to read the `model` field.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the forwarding router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/*tail", any(forward_request))
}

#[derive(Debug, Deserialize)]
struct ForwardBody {
    model: Option<String>,
}

/// ANY /v1/{tail} - resolve the target runner from the request's `model`
/// field and relay the request to it.
async fn forward_request(
    State(state): State<Arc<AppState>>,
    Path(tail): Path<String>,
    request: Request,
) -> Result<Response<Body>> {
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| Error::InvalidRequest(format!("failed to read request body: {e}")))?;

    let model = serde_json::from_slice::<ForwardBody>(&bytes)
        .ok()
        .and_then(|b| b.model)
        .ok_or_else(|| Error::InvalidRequest("model is required".to_string()))?;

    tracing::debug!(model = %model, tail = %tail, "dispatching request");

    let endpoint = state.manager.resolve(&model).await?;

    proxy::forward(
        &state.http,
        &endpoint,
        &tail,
        parts.method,
        &parts.headers,
        bytes,
    )
    .await
}
