//! Test utilities: app builder, cookie helpers, request builders.

#![allow(dead_code)]

use affcd_satellite::clock::ManualClock;
use affcd_satellite::config::Config;
use affcd_satellite::session::AnyBackend;
use affcd_satellite::session::memory::InMemoryBackend;
use affcd_satellite::session::store::SessionLayer;
use affcd_satellite::signer::Signer;
use affcd_satellite::{AppState, create_app};
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;

pub const T0: i64 = 1_700_000_000;
pub const COOKIE_NAME: &str = "affcd_session_site-test";

/// Build a test app with InMemoryBackend, a pinned clock and the given config.
pub fn build_test_app_with_config(
    config: Config,
    clock: Arc<ManualClock>,
) -> (axum::Router, Arc<AppState>) {
    let session_layer = Arc::new(
        SessionLayer::new(
            Arc::new(AnyBackend::Memory(InMemoryBackend::new())),
            config.session_config(),
        )
        .with_clock(clock.clone()),
    );
    let signer = Signer::from_config(reqwest::Client::new(), &config).with_clock(clock);

    let state = Arc::new(AppState {
        config,
        signer,
        session_layer,
    });

    let app = create_app(state.clone());
    (app, state)
}

pub fn build_test_app() -> (axum::Router, Arc<AppState>) {
    build_test_app_with_config(Config::test_default(), Arc::new(ManualClock::new(T0)))
}

/// Helper to read response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All `Set-Cookie` values on a response.
pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Session identifier established by the response, if any.
pub fn session_id_from(response: &Response) -> Option<String> {
    set_cookies(response).into_iter().find_map(|c| {
        c.split(';')
            .next()
            .and_then(|kv| kv.strip_prefix(&format!("{COOKIE_NAME}=")))
            .filter(|id| !id.is_empty())
            .map(String::from)
    })
}

pub fn request(method: &str, uri: &str, session_id: Option<&str>) -> Request<Body> {
    request_as(method, uri, session_id, "TestBrowser/1.0")
}

pub fn request_as(
    method: &str,
    uri: &str,
    session_id: Option<&str>,
    user_agent: &str,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("User-Agent", user_agent)
        .header("X-Forwarded-For", "198.51.100.20");
    if let Some(id) = session_id {
        builder = builder.header("Cookie", format!("{COOKIE_NAME}={id}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, session_id: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("User-Agent", "TestBrowser/1.0")
        .header("X-Forwarded-For", "198.51.100.20");
    if let Some(id) = session_id {
        builder = builder.header("Cookie", format!("{COOKIE_NAME}={id}"));
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}
