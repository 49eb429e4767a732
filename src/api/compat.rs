//! Ollama-compatible API surface.
//!
//! Clients that speak the Ollama API get sensible answers for discovery
//! endpoints; management operations that would require a model repository
//! are explicit 501 stubs.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the compat router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/api/version", get(version))
        .route("/api/tags", get(tags))
        .route("/api/ps", get(ps))
        .route("/api/pull", post(not_implemented))
        .route("/api/generate", post(not_implemented))
        .route("/api/chat", post(not_implemented))
        .route("/api/embed", post(not_implemented))
        .route("/api/embeddings", post(not_implemented))
        .route("/api/create", post(not_implemented))
        .route("/api/push", post(not_implemented))
        .route("/api/copy", post(not_implemented))
        .route("/api/delete", delete(not_implemented))
        .route("/api/show", post(not_implemented))
        .route("/api/blobs/:digest", post(not_implemented).head(not_implemented))
}

/// GET / - liveness banner, mirrors Ollama's.
async fn index() -> &'static str {
    "Ollama is running"
}

/// GET /api/version
async fn version() -> Json<Value> {
    Json(json!({ "version": VERSION }))
}

/// GET /api/tags - the catalog in Ollama tag shape.
async fn tags(State(state): State<Arc<AppState>>) -> Json<Value> {
    let models: Vec<Value> = state
        .catalog
        .model_ids()
        .into_iter()
        .map(|id| json!({ "name": id, "model": id }))
        .collect();

    Json(json!({ "models": models }))
}

/// GET /api/ps - the active runner, if any.
async fn ps(State(state): State<Arc<AppState>>) -> Json<Value> {
    let models: Vec<Value> = state
        .manager
        .active_model()
        .await
        .into_iter()
        .map(|id| json!({ "name": id, "model": id }))
        .collect();

    Json(json!({ "models": models }))
}

async fn not_implemented() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({ "error": "not implemented" })),
    )
}
