use axum::body::to_bytes;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use agstream_contract::testing::{ManualClock, SequentialIdGenerator};
use agstream_contract::Pacing;
use agstream_protocol_ag_ui::{DecodedFrame, EventKind, FrameDecoder};
use agstream_server::config::{AgentSpec, Config};
use agstream_server::http::{router, AppState};

/// One unpaced agent streaming `"hi there"` on thread `demo-thread`.
pub fn demo_config() -> Config {
    Config {
        agents: vec![AgentSpec::new("demo", "hi there").with_thread_id("demo-thread")],
    }
}

/// State with deterministic ids and a fixed clock; pacing is disabled.
pub fn test_state(config: Config) -> AppState {
    AppState::new(
        config,
        Arc::new(SequentialIdGenerator::new("id")),
        Arc::new(ManualClock::new(1_700_000_000_000)),
    )
    .expect("tool registry should build")
    .with_pacing_override(Some(Pacing::None))
}

pub fn test_app(config: Config) -> axum::Router {
    router(test_state(config))
}

/// Send a POST request and return `(status, headers, body_text)`.
pub async fn post(app: axum::Router, uri: &str, body: &str) -> (StatusCode, HeaderMap, String) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(axum::body::Body::from(body.to_string()))
                .expect("request build should succeed"),
        )
        .await
        .expect("app should handle request");

    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let text = String::from_utf8(body.to_vec()).expect("response body must be utf-8");
    (status, headers, text)
}

/// Send a GET request and return `(status, body_text)`.
#[allow(dead_code)]
pub async fn get_json_text(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(axum::body::Body::empty())
                .expect("request build should succeed"),
        )
        .await
        .expect("app should handle request");

    let status = resp.status();
    let body = to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("response body should be readable");
    let text = String::from_utf8(body.to_vec()).expect("response body must be utf-8");
    (status, text)
}

pub fn json(text: &str) -> Value {
    serde_json::from_str(text).expect("body must be JSON")
}

pub fn frames(sse: &str) -> Vec<DecodedFrame> {
    FrameDecoder::decode_all(sse.as_bytes()).expect("stream must decode")
}

pub fn kinds(frames: &[DecodedFrame]) -> Vec<EventKind> {
    frames.iter().map(|f| f.kind).collect()
}

/// Concatenated deltas of all content frames.
pub fn extract_text(frames: &[DecodedFrame]) -> String {
    frames
        .iter()
        .filter(|f| f.kind == EventKind::TextMessageContent)
        .filter_map(|f| f.data["delta"].as_str().map(String::from))
        .collect()
}
