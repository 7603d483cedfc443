//! Integration tests for all HTTP route handlers.
//!
//! Uses Tower's `oneshot()` to test the full Axum app including middleware.

mod common;

use affcd_satellite::clock::ManualClock;
use affcd_satellite::config::Config;
use affcd_satellite::signer::{SCHEMA_VERSION, sign};
use axum::http::StatusCode;
use common::{
    T0, body_json, build_test_app, build_test_app_with_config, json_request, request, request_as,
    session_id_from, set_cookies,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Land on /track and return the issued session identifier.
async fn tracked_session(app: &axum::Router, code: &str) -> String {
    let resp = app
        .clone()
        .oneshot(request("GET", &format!("/track?ref={code}"), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    session_id_from(&resp).expect("session cookie issued")
}

// ───── GET /health ─────

#[tokio::test]
async fn test_health() {
    let (app, _state) = build_test_app();

    let resp = app.oneshot(request("GET", "/health", None)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["site_id"], "site-test");
    assert_eq!(body["backend"], "memory");
}

// ───── GET /track + GET /session ─────

#[tokio::test]
async fn test_first_visit_then_reload_keeps_attribution() {
    let (app, _state) = build_test_app();

    let resp = app
        .clone()
        .oneshot(request("GET", "/track?ref=ABC123&campaign=spring", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookies = set_cookies(&resp);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[0].contains("SameSite=Lax"));
    assert!(cookies[0].contains("Max-Age=86400"));
    assert!(!cookies[0].contains("Secure"));
    let session_id = session_id_from(&resp).unwrap();
    assert_eq!(session_id.len(), 32);
    assert_eq!(body_json(resp).await["affiliate_code"], "ABC123");

    let resp = app
        .oneshot(request("GET", "/session", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).is_empty());
    let body = body_json(resp).await;
    assert_eq!(body["session_id"], session_id.as_str());
    assert_eq!(body["affiliate_code"], "ABC123");
    assert_eq!(body["cart_count"], 0);
}

#[tokio::test]
async fn test_secure_cookie_behind_tls_proxy() {
    let (app, _state) = build_test_app();
    let mut req = request("GET", "/track?ref=ABC", None);
    req.headers_mut()
        .insert("X-Forwarded-Proto", "https".parse().unwrap());

    let resp = app.oneshot(req).await.unwrap();
    assert!(set_cookies(&resp)[0].contains("Secure"));
}

#[tokio::test]
async fn test_track_requires_valid_code() {
    let (app, _state) = build_test_app();

    let resp = app
        .clone()
        .oneshot(request("GET", "/track", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "Missing ref parameter");

    let resp = app
        .oneshot(request("GET", "/track?ref=%3Cscript%3E", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_expires_after_ttl() {
    let clock = Arc::new(ManualClock::new(T0));
    let (app, state) = build_test_app_with_config(Config::test_default(), clock.clone());
    let session_id = tracked_session(&app, "ABC").await;

    clock.set(T0 + state.config.session_ttl_secs + 1);
    let resp = app
        .oneshot(request("GET", "/session", Some(&session_id)))
        .await
        .unwrap();
    let fresh = session_id_from(&resp).unwrap();
    assert_ne!(fresh, session_id);
    assert!(body_json(resp).await["affiliate_code"].is_null());
}

#[tokio::test]
async fn test_read_only_visits_keep_identity() {
    let (app, _state) = build_test_app();

    let resp = app
        .clone()
        .oneshot(request("GET", "/session", None))
        .await
        .unwrap();
    let session_id = session_id_from(&resp).unwrap();
    assert_eq!(body_json(resp).await["session_id"], session_id.as_str());

    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(request("GET", "/session", Some(&session_id)))
            .await
            .unwrap();
        assert!(set_cookies(&resp).is_empty());
        assert_eq!(body_json(resp).await["session_id"], session_id.as_str());
    }

    // First write lands under the identifier the browser already holds.
    let resp = app
        .clone()
        .oneshot(request("GET", "/track?ref=LATE", Some(&session_id)))
        .await
        .unwrap();
    assert!(set_cookies(&resp).is_empty());
    let resp = app
        .oneshot(request("GET", "/session", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["affiliate_code"], "LATE");
}

#[tokio::test]
async fn test_malformed_cookie_gets_fresh_identity() {
    let (app, _state) = build_test_app();
    let resp = app
        .oneshot(request("GET", "/session", Some("../../etc/passwd")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let issued = session_id_from(&resp).unwrap();
    assert_eq!(issued.len(), 32);
}

// ───── Security pinning ─────

#[tokio::test]
async fn test_user_agent_change_destroys_session() {
    let (app, _state) = build_test_app();
    let session_id = tracked_session(&app, "ABC").await;

    let resp = app
        .oneshot(request_as(
            "GET",
            "/session",
            Some(&session_id),
            "SomethingElse/2.0",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).iter().any(|c| c.contains("Max-Age=0")));
    let body = body_json(resp).await;
    assert!(body["affiliate_code"].is_null());
    assert_ne!(body["session_id"], session_id.as_str());
}

#[tokio::test]
async fn test_user_agent_change_tolerated_when_check_disabled() {
    let mut config = Config::test_default();
    config.check_user_agent = false;
    let (app, _state) = build_test_app_with_config(config, Arc::new(ManualClock::new(T0)));
    let session_id = tracked_session(&app, "ABC").await;

    let resp = app
        .oneshot(request_as(
            "GET",
            "/session",
            Some(&session_id),
            "SomethingElse/2.0",
        ))
        .await
        .unwrap();
    assert!(set_cookies(&resp).is_empty());
    assert_eq!(body_json(resp).await["affiliate_code"], "ABC");
}

#[tokio::test]
async fn test_ip_pinning_ignores_client_supplied_hops() {
    let mut config = Config::test_default();
    config.check_ip = true;
    let (app, _state) = build_test_app_with_config(config, Arc::new(ManualClock::new(T0)));
    // Created from 198.51.100.20 (see `common::request_as`).
    let session_id = tracked_session(&app, "ABC").await;

    let resp = app
        .clone()
        .oneshot(request("GET", "/session", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["affiliate_code"], "ABC");

    let mut req = request("GET", "/session", Some(&session_id));
    req.headers_mut().insert(
        "X-Forwarded-For",
        "198.51.100.20, 203.0.113.66".parse().unwrap(),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert!(set_cookies(&resp).iter().any(|c| c.contains("Max-Age=0")));
    assert!(body_json(resp).await["affiliate_code"].is_null());
}

// ───── Cart ─────

#[tokio::test]
async fn test_cart_add_remove_clear() {
    let (app, _state) = build_test_app();
    let session_id = tracked_session(&app, "ABC").await;

    for sku in ["a", "b", "c"] {
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/cart", Some(&session_id), &json!({ "sku": sku })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(request("DELETE", "/cart/1", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await["cart"],
        json!([{ "sku": "a" }, { "sku": "c" }])
    );

    let resp = app
        .clone()
        .oneshot(request("DELETE", "/cart/2", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .clone()
        .oneshot(request("DELETE", "/cart", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["cart"], json!([]));

    let resp = app
        .oneshot(request("GET", "/session", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["cart_count"], 0);
}

// ───── POST /session/regenerate ─────

#[tokio::test]
async fn test_regenerate_moves_session() {
    let (app, _state) = build_test_app();
    let old_id = tracked_session(&app, "ABC").await;

    let resp = app
        .clone()
        .oneshot(request("POST", "/session/regenerate", Some(&old_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let new_id = session_id_from(&resp).unwrap();
    assert_ne!(new_id, old_id);
    assert_eq!(body_json(resp).await["session_id"], new_id.as_str());

    let resp = app
        .clone()
        .oneshot(request("GET", "/session", Some(&new_id)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["affiliate_code"], "ABC");

    let resp = app
        .oneshot(request("GET", "/session", Some(&old_id)))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert!(body["affiliate_code"].is_null());
    assert_eq!(body["cart_count"], 0);
}

// ───── POST /logout ─────

#[tokio::test]
async fn test_logout_destroys_session() {
    let (app, _state) = build_test_app();
    let session_id = tracked_session(&app, "ABC").await;

    let resp = app
        .clone()
        .oneshot(request("POST", "/logout", Some(&session_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(set_cookies(&resp).iter().any(|c| c.contains("Max-Age=0")));
    assert_eq!(body_json(resp).await["success"], true);

    let resp = app
        .oneshot(request("GET", "/session", Some(&session_id)))
        .await
        .unwrap();
    assert!(body_json(resp).await["affiliate_code"].is_null());
}

// ───── POST /conversion ─────

#[tokio::test]
async fn test_conversion_is_signed_and_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/conversions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"accepted": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::test_default();
    config.master_url = server.uri();
    let secret = config.site_secret.clone();
    let (app, _state) = build_test_app_with_config(config, Arc::new(ManualClock::new(T0)));
    let session_id = tracked_session(&app, "ABC123").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/conversion",
            Some(&session_id),
            &json!({"order_id": "o-77", "amount": 42.5, "coupon": "SPRING"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["tracked"], true);
    assert_eq!(body["status_code"], 201);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let sent = &received[0];
    let signature = sent.headers.get("x-affcd-signature").unwrap().to_str().unwrap();
    assert_eq!(signature, sign(&sent.body, secret.as_bytes()));
    assert_eq!(sent.headers.get("x-affcd-site").unwrap(), "site-test");
    assert_eq!(
        sent.headers.get("x-affcd-timestamp").unwrap(),
        T0.to_string().as_str()
    );

    let payload: Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(payload["schema_version"], SCHEMA_VERSION);
    assert_eq!(payload["site_id"], "site-test");
    assert_eq!(payload["event"], "conversion");
    assert_eq!(payload["affiliate_code"], "ABC123");
    assert_eq!(payload["order_id"], "o-77");
    assert_eq!(payload["currency"], "USD");
    assert_eq!(payload["coupon"], "SPRING");
    assert_eq!(payload["session_id"], session_id.as_str());
    assert_eq!(payload["landing_page"], "/track?ref=ABC123");
}

#[tokio::test]
async fn test_source_fields_cannot_overwrite_captured_attribution() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/conversions"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::test_default();
    config.master_url = server.uri();
    let (app, _state) = build_test_app_with_config(config, Arc::new(ManualClock::new(T0)));

    let landing = "/track?ref=ABC123&code=EVIL&timestamp=y&ip_address=1.1.1.1&landing_page=x";
    let resp = app
        .clone()
        .oneshot(request("GET", landing, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session_id = session_id_from(&resp).unwrap();

    let resp = app
        .oneshot(json_request(
            "POST",
            "/conversion",
            Some(&session_id),
            &json!({"order_id": "o-9", "amount": 3.0}),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["tracked"], true);

    let received = server.received_requests().await.unwrap();
    let payload: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(payload["affiliate_code"], "ABC123");
    assert_eq!(payload["attributed_at"], T0);
    assert_eq!(payload["landing_page"], landing);
}

#[tokio::test]
async fn test_conversion_without_attribution() {
    let (app, _state) = build_test_app();
    let resp = app
        .oneshot(json_request(
            "POST",
            "/conversion",
            None,
            &json!({"order_id": "o-1", "amount": 1.0}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["tracked"], false);
}

#[tokio::test]
async fn test_conversion_master_unreachable() {
    let mut config = Config::test_default();
    config.master_url = "http://127.0.0.1:9".into();
    config.post_timeout_secs = 2;
    let (app, _state) = build_test_app_with_config(config, Arc::new(ManualClock::new(T0)));
    let session_id = tracked_session(&app, "ABC").await;

    let resp = app
        .oneshot(json_request(
            "POST",
            "/conversion",
            Some(&session_id),
            &json!({"order_id": "o-1", "amount": 1.0}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["tracked"], false);
    assert_eq!(body["status_code"], 0);
    assert!(!body["error"].as_str().unwrap().is_empty());
}
