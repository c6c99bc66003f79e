mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap, Request, StatusCode};
use common::{TestApp, TEST_PASSWORD};
use serial_test::serial;
use thrift_api::config::Config;
use thrift_api::rate_limit::{client_ip, CounterStore, LimitClass, LimitPolicy};

fn login_from(ip: &str, email: &str, password: &str) -> Request<Body> {
    let body = serde_json::json!({"email": email, "password": password});
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("Content-Type", "application/json")
        .header("X-Forwarded-For", format!("{ip}, 10.0.0.1"))
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn register_from(ip: &str, n: u32) -> Request<Body> {
    let body = serde_json::json!({
        "email": format!("new{n}@test.com"),
        "username": format!("new_user_{n}"),
        "password": TEST_PASSWORD,
    });
    Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header("Content-Type", "application/json")
        .header("X-Real-IP", ip)
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

// ─── Auth limiter ────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn sixth_failed_login_is_throttled() {
    let app = TestApp::new().await;
    app.seed_user("victim@test.com", "victim").await;

    for _ in 0..5 {
        app.request(login_from("198.51.100.1", "victim@test.com", "WrongPass1"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    // Even the right password is refused before reaching the handler
    let resp = app
        .request(login_from("198.51.100.1", "victim@test.com", TEST_PASSWORD))
        .await;
    resp.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["success"], false);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Too many authentication attempts"));

    // Another client is unaffected
    app.request(login_from("198.51.100.2", "victim@test.com", TEST_PASSWORD))
        .await
        .assert_status(StatusCode::OK);
}

#[serial]
#[tokio::test]
async fn successful_logins_are_not_counted() {
    let app = TestApp::new().await;
    app.seed_user("regular@test.com", "regular").await;

    for _ in 0..8 {
        app.request(login_from("198.51.100.3", "regular@test.com", TEST_PASSWORD))
            .await
            .assert_status(StatusCode::OK);
    }
}

#[serial]
#[tokio::test]
async fn spoofed_forwarded_for_is_ignored_without_trusted_proxy() {
    let app = TestApp::with_config(Config {
        trust_proxy_headers: false,
        ..common::test_config()
    })
    .await;
    app.seed_user("target@test.com", "target").await;

    // A new forged address on every attempt
    for n in 0..5 {
        app.request(login_from(&format!("203.0.113.{n}"), "target@test.com", "WrongPass1"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let resp = app
        .request(login_from("203.0.113.99", "target@test.com", "WrongPass1"))
        .await;
    resp.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

// ─── Account creation limiter ────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn fourth_signup_per_hour_is_throttled() {
    let app = TestApp::new().await;

    for n in 0..3 {
        app.request(register_from("192.0.2.10", n))
            .await
            .assert_status(StatusCode::OK);
    }

    let resp = app.request(register_from("192.0.2.10", 3)).await;
    resp.assert_status(StatusCode::TOO_MANY_REQUESTS);

    app.request(register_from("192.0.2.11", 4))
        .await
        .assert_status(StatusCode::OK);
}

// ─── Client IP ───────────────────────────────────────────────────────────────

fn forwarded_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", "198.51.100.7, 10.0.0.1".parse().unwrap());
    headers.insert("x-real-ip", "198.51.100.8".parse().unwrap());
    headers
}

fn peer(addr: &str) -> Extensions {
    let mut extensions = Extensions::new();
    extensions.insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
    extensions
}

#[test]
fn client_ip_uses_forwarded_hop_only_when_trusted() {
    let headers = forwarded_headers();
    let extensions = peer("192.0.2.1:5555");

    assert_eq!(
        client_ip(&headers, &extensions, true).as_deref(),
        Some("198.51.100.7")
    );
    assert_eq!(
        client_ip(&headers, &extensions, false).as_deref(),
        Some("192.0.2.1")
    );
}

#[test]
fn client_ip_falls_back_to_real_ip_then_peer() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", "198.51.100.8".parse().unwrap());
    assert_eq!(
        client_ip(&headers, &Extensions::new(), true).as_deref(),
        Some("198.51.100.8")
    );

    assert_eq!(
        client_ip(&HeaderMap::new(), &peer("192.0.2.2:80"), true).as_deref(),
        Some("192.0.2.2")
    );
    assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new(), false), None);
}

// ─── Counter store ───────────────────────────────────────────────────────────

#[tokio::test]
async fn classes_have_independent_counters() {
    let store = CounterStore::new();

    for _ in 0..5 {
        assert!(store.hit(&LimitPolicy::AUTH, "1.2.3.4").await);
    }
    assert!(!store.hit(&LimitPolicy::AUTH, "1.2.3.4").await);

    // Same IP, different class
    assert!(store.hit(&LimitPolicy::SCAN, "1.2.3.4").await);
    assert!(store.hit(&LimitPolicy::API, "1.2.3.4").await);
}

#[tokio::test]
async fn window_resets_after_it_elapses() {
    let store = CounterStore::new();
    let policy = LimitPolicy {
        class: LimitClass::Scan,
        max_requests: 2,
        window: Duration::from_millis(50),
        skip_successful: false,
        message: "slow down",
    };

    assert!(store.hit(&policy, "ip").await);
    assert!(store.hit(&policy, "ip").await);
    assert!(!store.hit(&policy, "ip").await);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(store.hit(&policy, "ip").await);
}

#[tokio::test]
async fn undo_takes_back_one_hit() {
    let store = CounterStore::new();
    let policy = LimitPolicy {
        max_requests: 1,
        ..LimitPolicy::AUTH
    };

    assert!(store.hit(&policy, "ip").await);
    store.undo(&policy, "ip").await;
    assert!(store.hit(&policy, "ip").await);
    assert!(!store.hit(&policy, "ip").await);
}
