//! Health endpoint smoke test.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get};

#[tokio::test]
async fn test_health_reports_ok() {
    let (app, _store) = build_test_app();
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["store_healthy"], true);
    assert!(json["version"].is_string());
}
