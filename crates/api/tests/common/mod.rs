use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use rbin_api::config::ServerConfig;
use rbin_api::router::build_app_router;
use rbin_api::state::AppState;
use rbin_core::registry::EntityRegistry;
use rbin_core::store::memory::MemoryRowStore;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3001".to_string()],
        request_timeout_secs: 30,
    }
}

/// Build the full application router over an in-memory row store.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses. The store is returned so tests
/// can seed rows and inspect state directly.
pub fn build_test_app() -> (Router, Arc<MemoryRowStore>) {
    let store = Arc::new(MemoryRowStore::new());
    let registry = Arc::new(EntityRegistry::standard());
    let config = test_config();
    let state = AppState::new(store.clone(), registry, Arc::new(config.clone()));
    (build_app_router(state, &config), store)
}

async fn send(app: Router, method: Method, uri: &str, actor: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

#[allow(dead_code)]
pub async fn post(app: Router, uri: &str) -> Response {
    send(app, Method::POST, uri, None).await
}

#[allow(dead_code)]
pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

#[allow(dead_code)]
pub async fn delete_as(app: Router, uri: &str, actor: &str) -> Response {
    send(app, Method::DELETE, uri, Some(actor)).await
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
