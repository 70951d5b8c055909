// tests/api_http.rs
//
// HTTP-level tests for the Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

mod common;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use common::*;
use crypto_news_relay::api::{self, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router(h: &Harness) -> Router {
    api::router(
        AppState {
            scheduler: h.scheduler.clone(),
        },
        None,
    )
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, String::from_utf8(bytes).expect("utf8"))
}

#[tokio::test]
async fn health_returns_ok() {
    let h = default_harness(vec![], &[]);
    let (status, body) = get(test_router(&h), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.trim(), "OK");
}

#[tokio::test]
async fn debug_ledger_and_cycles_reflect_a_sweep() {
    let h = default_harness(items(1..=2), &[link(9)]);
    h.scheduler.sweep_cycle().await;

    let (status, body) = get(test_router(&h), "/debug/ledger").await;
    assert_eq!(status, StatusCode::OK);
    let links: Vec<String> = serde_json::from_str(&body).unwrap();
    assert_eq!(links, vec![link(9), link(1), link(2)]);

    let (status, body) = get(test_router(&h), "/debug/cycles").await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_str(&body).unwrap();
    let cycles = v.as_array().expect("array");
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0]["kind"], "sweep");
    assert_eq!(cycles[0]["delivered"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn metrics_route_absent_without_recorder() {
    let h = default_harness(vec![], &[]);
    let (status, _) = get(test_router(&h), "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
