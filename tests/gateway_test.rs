//! End-to-end router tests with a fake process boundary and a real HTTP
//! backend standing in for llama-server.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use llamagate::test_util::{test_launch_config, test_lifecycle, FakeProbe, FakeProcessControl};
use llamagate::{api, AppState, Catalog, Config, RunnerManager};

struct TestGateway {
    app: axum::Router,
    control: Arc<FakeProcessControl>,
}

/// Gateway whose catalog points `model-a` at `backend_port`.
fn test_gateway(backend_port: u16) -> TestGateway {
    let catalog = Catalog::new(HashMap::from([(
        "model-a".to_string(),
        test_launch_config(backend_port),
    )]));

    let control = Arc::new(FakeProcessControl::new());
    let manager = RunnerManager::new(
        catalog.clone(),
        control.clone(),
        Arc::new(FakeProbe::ready_now()),
        test_lifecycle(),
    );
    let state = Arc::new(AppState::new(Config::default(), catalog, manager));

    TestGateway {
        app: api::router().with_state(state),
        control,
    }
}

async fn mock_backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"choices\":[]}"))
        .mount(&server)
        .await;
    server
}

fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_forward_spawns_runner_and_relays() {
    let backend = mock_backend().await;
    let gateway = test_gateway(backend.address().port());

    let response = gateway
        .app
        .clone()
        .oneshot(chat_request("{\"model\":\"model-a\"}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(gateway.control.spawn_count(), 1);

    let argv = gateway.control.argv(0);
    assert_eq!(argv[0], "llama-server");
    assert!(argv.contains(&"--model".to_string()));

    let body = body_json(response).await;
    assert_eq!(body["choices"], serde_json::json!([]));
}

#[tokio::test]
async fn test_repeat_requests_reuse_runner() {
    let backend = mock_backend().await;
    let gateway = test_gateway(backend.address().port());

    for _ in 0..3 {
        let response = gateway
            .app
            .clone()
            .oneshot(chat_request("{\"model\":\"model-a\"}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(gateway.control.spawn_count(), 1);
    assert_eq!(gateway.control.process(0).terminate_count(), 0);
}

#[tokio::test]
async fn test_missing_model_field_is_rejected() {
    let gateway = test_gateway(9);

    let response = gateway
        .app
        .clone()
        .oneshot(chat_request("{\"messages\":[]}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(gateway.control.spawn_count(), 0);
}

#[tokio::test]
async fn test_unknown_model_is_404_and_spawns_nothing() {
    let gateway = test_gateway(9);

    let response = gateway
        .app
        .clone()
        .oneshot(chat_request("{\"model\":\"mystery\"}"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(gateway.control.spawn_count(), 0);

    let body = body_json(response).await;
    assert_eq!(body["error"]["type"], "model_not_found");
}

#[tokio::test]
async fn test_list_models() {
    let gateway = test_gateway(9);

    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/models")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["object"], "list");
    assert_eq!(body["data"][0]["id"], "model-a");
}

#[tokio::test]
async fn test_index_banner() {
    let gateway = test_gateway(9);

    let response = gateway
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Ollama is running");
}

#[tokio::test]
async fn test_version_and_tags() {
    let gateway = test_gateway(9);

    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["version"], env!("CARGO_PKG_VERSION"));

    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/tags")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["models"][0]["name"], "model-a");
}

#[tokio::test]
async fn test_ps_reports_active_runner() {
    let backend = mock_backend().await;
    let gateway = test_gateway(backend.address().port());

    // Empty before any dispatch
    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/ps")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["models"], serde_json::json!([]));

    gateway
        .app
        .clone()
        .oneshot(chat_request("{\"model\":\"model-a\"}"))
        .await
        .unwrap();

    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/ps")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["models"][0]["name"], "model-a");
}

#[tokio::test]
async fn test_pull_is_not_implemented() {
    let gateway = test_gateway(9);

    let response = gateway
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/pull")
                .header("content-type", "application/json")
                .body(Body::from("{\"model\":\"org/repo:file.gguf\"}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}
