mod common;

use axum::http::StatusCode;
use common::TestApp;
use serial_test::serial;
use thrift_api::security::{CONTENT_SECURITY_POLICY, STRICT_TRANSPORT_SECURITY};

// ─── Health ──────────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn health_check() {
    let app = TestApp::new().await;

    let resp = app.get("/health", None).await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(resp.json::<serde_json::Value>()["status"], "ok");
}

// ─── Security headers ────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn security_headers_on_success_and_error() {
    let app = TestApp::new().await;

    for resp in [
        app.get("/health", None).await,
        app.get("/api/users/me", None).await,
        app.get("/no-such-route", None).await,
    ] {
        assert_eq!(
            resp.header("content-security-policy"),
            Some(CONTENT_SECURITY_POLICY)
        );
        assert_eq!(
            resp.header("strict-transport-security"),
            Some(STRICT_TRANSPORT_SECURITY)
        );
        assert_eq!(resp.header("x-content-type-options"), Some("nosniff"));
        assert_eq!(resp.header("x-frame-options"), Some("DENY"));
    }
}

#[test]
fn csp_allows_google_sign_in_and_fonts() {
    assert!(CONTENT_SECURITY_POLICY.starts_with("default-src 'self'"));
    assert!(CONTENT_SECURITY_POLICY.contains("script-src 'self' https://accounts.google.com"));
    assert!(CONTENT_SECURITY_POLICY.contains("https://fonts.googleapis.com"));
    assert!(CONTENT_SECURITY_POLICY.contains("font-src 'self' https://fonts.gstatic.com"));
    assert!(STRICT_TRANSPORT_SECURITY.contains("max-age=31536000"));
    assert!(STRICT_TRANSPORT_SECURITY.contains("includeSubDomains"));
}

// ─── Legal pages ─────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn legal_pages_are_served_as_html() {
    let dir = common::temp_dir();
    std::fs::write(dir.join("terms.html"), "<h1>Terms of Service</h1>").unwrap();
    std::fs::write(dir.join("privacy.html"), "<h1>Privacy Policy</h1>").unwrap();
    let app = TestApp::with_legal_dir(dir.clone()).await;

    let resp = app.get("/terms", None).await;
    resp.assert_status(StatusCode::OK);
    assert!(resp.header("content-type").unwrap().starts_with("text/html"));
    assert_eq!(resp.text(), "<h1>Terms of Service</h1>");

    let resp = app.get("/privacy", None).await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(resp.text(), "<h1>Privacy Policy</h1>");

    std::fs::remove_dir_all(dir).ok();
}

#[serial]
#[tokio::test]
async fn missing_legal_page_is_not_found() {
    let dir = common::temp_dir();
    std::fs::write(dir.join("terms.html"), "<h1>Terms</h1>").unwrap();
    let app = TestApp::with_legal_dir(dir.clone()).await;

    app.get("/privacy", None)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    std::fs::remove_dir_all(dir).ok();
}

#[serial]
#[tokio::test]
async fn unreadable_legal_dir_is_server_error() {
    // A regular file where the directory should be
    let dir = common::temp_dir();
    let not_a_dir = dir.join("legal");
    std::fs::write(&not_a_dir, "oops").unwrap();
    let app = TestApp::with_legal_dir(not_a_dir).await;

    let resp = app.get("/terms", None).await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.json::<serde_json::Value>()["error"], "internal_error");

    std::fs::remove_dir_all(dir).ok();
}

// ─── Body limit ──────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = TestApp::with_config(thrift_api::config::Config {
        max_body_bytes: 1024,
        ..common::test_config()
    })
    .await;
    let session = app.session("big@test.com", "big_user").await;

    let body = serde_json::json!({
        "item_name": "Huge",
        "ai_response": {"raw": "x".repeat(4096)},
    });
    let resp = app.create_scan(&session.access_token, body).await;
    resp.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}
