//! Models endpoint (OpenAI-compatible).

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::AppState;

/// Build the models router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/models", get(list_models))
}

/// OpenAI-compatible model list response.
#[derive(Debug, Serialize)]
struct ModelsResponse {
    object: &'static str,
    data: Vec<ModelData>,
}

#[derive(Debug, Serialize)]
struct ModelData {
    id: String,
    object: &'static str,
    owned_by: &'static str,
}

/// GET /v1/models - List the models the catalog can launch.
async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let data = state
        .catalog
        .model_ids()
        .into_iter()
        .map(|id| ModelData {
            id,
            object: "model",
            owned_by: "local",
        })
        .collect();

    Json(ModelsResponse {
        object: "list",
        data,
    })
}
