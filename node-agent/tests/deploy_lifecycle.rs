use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use node_agent::{routes, AppState};
use orchestrator_core::{FakeEngine, Orchestrator, PortAllocator};
use protocol::{DeployRequest, Protocol, WebhookConfig, NODE_SECRET_HEADER};
use tower::ServiceExt;

const SECRET: &str = "test-secret";

fn app() -> axum::Router {
    let engine = Arc::new(FakeEngine::new());
    let ports = Arc::new(PortAllocator::new(31000..=31010));
    let orchestrator = Arc::new(Orchestrator::new(engine, ports, PathBuf::from("wake-proxy")));
    let state = AppState {
        orchestrator,
        node_secret: Arc::from(SECRET),
    };
    routes::router(state)
}

fn deploy_body() -> Vec<u8> {
    serde_json::to_vec(&DeployRequest {
        server_id: 7,
        image: "itzg/minecraft-server".to_string(),
        internal_port: 25565,
        protocol: Protocol::Tcp,
        env_vars: HashMap::new(),
        min_ram_mb: 1024,
        min_cpu: 1.0,
        webhook: WebhookConfig {
            webhook_url: "http://control-plane/api/webhook/wake".to_string(),
            webhook_token: "token".to_string(),
        },
    })
    .unwrap()
}

#[tokio::test]
async fn rejects_requests_without_the_node_secret() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/deploy")
                .header("content-type", "application/json")
                .body(Body::from(deploy_body()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deploy_then_wake_then_delete_round_trips() {
    let app = app();

    let deploy_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/deploy")
                .header("content-type", "application/json")
                .header(NODE_SECRET_HEADER, SECRET)
                .body(Body::from(deploy_body()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deploy_response.status(), StatusCode::OK);

    let wake_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/servers/7/wake")
                .header(NODE_SECRET_HEADER, SECRET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wake_response.status(), StatusCode::OK);

    let delete_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/servers/7")
                .header(NODE_SECRET_HEADER, SECRET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete_response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_check_needs_no_secret() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
