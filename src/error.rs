//! Error types for the gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error types for runner lifecycle and request forwarding.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to spawn backend: {0}")]
    Spawn(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend readiness timeout: {0}")]
    ReadinessTimeout(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Upstream stream error: {0}")]
    UpstreamStream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::ModelNotFound(_) => (StatusCode::NOT_FOUND, "model_not_found"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::Spawn(_) => (StatusCode::INTERNAL_SERVER_ERROR, "spawn_failed"),
            Error::BackendUnavailable(_) => (StatusCode::BAD_GATEWAY, "backend_unavailable"),
            Error::ReadinessTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "readiness_timeout"),
            Error::BackendUnreachable(_) => (StatusCode::BAD_GATEWAY, "backend_unreachable"),
            Error::UpstreamStream(_) => (StatusCode::BAD_GATEWAY, "upstream_stream_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(error: Error) -> StatusCode {
        error.into_response().status()
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(status_of(Error::ModelNotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::InvalidRequest("x".into())), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_backend_errors_are_5xx() {
        assert_eq!(status_of(Error::Spawn("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(Error::BackendUnavailable("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(Error::ReadinessTimeout("x".into())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_of(Error::BackendUnreachable("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_of(Error::UpstreamStream("x".into())), StatusCode::BAD_GATEWAY);
    }
}
