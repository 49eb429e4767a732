//! Streaming request forwarder.
//!
//! Relays an inbound request to a ready backend and streams the response body
//! back chunk by chunk. Nothing is buffered whole on the response path, which
//! preserves incremental token output from the backend.

use axum::body::Body;
use axum::http::{HeaderMap, Method, Response};
use bytes::Bytes;

use crate::catalog::Endpoint;
use crate::error::{Error, Result};

/// Headers that must not be relayed between hops.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.to_ascii_lowercase().as_str())
}

/// Forward `{method} /v1/{tail}` to the backend at `endpoint` and relay the
/// reply as a stream.
///
/// A connect failure surfaces as [`Error::BackendUnreachable`] before any
/// bytes are written to the caller. Once the status line is committed, a
/// dropped backend connection can only abort the response stream.
pub async fn forward(
    client: &reqwest::Client,
    endpoint: &Endpoint,
    tail: &str,
    method: Method,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response<Body>> {
    let url = format!("http://{endpoint}/v1/{tail}");
    tracing::debug!(url = %url, "forwarding to backend");

    let mut request = client.request(method, &url);
    for (name, value) in headers {
        if !is_hop_by_hop(name.as_str()) {
            request = request.header(name, value);
        }
    }

    let upstream = request.body(body).send().await.map_err(|e| {
        if e.is_connect() {
            Error::BackendUnreachable(format!("connect to {endpoint} failed: {e}"))
        } else {
            Error::UpstreamStream(format!("request to {endpoint} failed: {e}"))
        }
    })?;

    let mut response = Response::builder().status(upstream.status());
    if let Some(response_headers) = response.headers_mut() {
        for (name, value) in upstream.headers() {
            if !is_hop_by_hop(name.as_str()) {
                // append, not insert: multi-valued headers (set-cookie)
                // must keep every value
                response_headers.append(name.clone(), value.clone());
            }
        }
    }

    // Each chunk is written to the caller as it arrives from the backend;
    // the response finishes only when the backend signals end-of-body.
    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| Error::Internal(e.to_string()))
}
