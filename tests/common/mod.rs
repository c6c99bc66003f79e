#![allow(dead_code)]

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Database, EntityTrait, QueryFilter};
use thrift_api::auth::jwt::JwtManager;
use thrift_api::auth::password::hash_password;
use thrift_api::config::Config;
use thrift_api::db::queries;
use thrift_api::db::queries::users::NewUser;
use thrift_api::rate_limit::CounterStore;
use thrift_api::routes::create_router;
use thrift_api::AppState;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "Thrifty2024";

// ─── TestResponse ────────────────────────────────────────────────────────────

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body_bytes).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize response as {}: {e}\nBody: {}",
                std::any::type_name::<T>(),
                self.text()
            )
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {expected}, got {}. Body: {}",
            self.status,
            self.text()
        );
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
}

// ─── TestApp ─────────────────────────────────────────────────────────────────

pub struct TestApp {
    router: Router,
    pub state: AppState,
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        automation_database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret-that-is-at-least-32-bytes-long".to_string(),
        jwt_issuer: "thrift-api-test".to_string(),
        jwt_access_token_expiry_secs: 3600,
        refresh_token_expiry_days: 30,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        cors_allowed_origins: "http://localhost:8081".to_string(),
        trust_proxy_headers: true,
        legal_pages_dir: PathBuf::from("does-not-exist"),
        max_body_bytes: 10 * 1024 * 1024,
    }
}

/// A fresh directory under the system temp dir.
pub fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("thrift-api-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_legal_dir(dir: PathBuf) -> Self {
        Self::with_config(Config {
            legal_pages_dir: dir,
            ..test_config()
        })
        .await
    }

    pub async fn with_config(config: Config) -> Self {
        let db = Database::connect(&config.database_url)
            .await
            .expect("Failed to connect to in-memory SQLite");

        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let jwt = JwtManager::new(&config).expect("Failed to init JwtManager");

        let state = AppState {
            db,
            jwt,
            config,
            counters: CounterStore::new(),
        };

        let router = create_router(state.clone());

        Self { router, state }
    }

    pub async fn request(&self, req: Request<Body>) -> TestResponse {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot failed");

        let status = resp.status();
        let headers = resp.headers().clone();
        let body_bytes = resp
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(build_request("GET", uri, token, None)).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request(build_request("POST", uri, token, Some(body)))
            .await
    }

    pub async fn patch_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request(build_request("PATCH", uri, token, Some(body)))
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(build_request("DELETE", uri, token, None))
            .await
    }

    // ── User helpers ─────────────────────────────────────────────────────

    /// Insert a user directly, bypassing the sign-up rate limit.
    pub async fn seed_user(&self, email: &str, username: &str) -> String {
        let user = queries::users::insert(
            &self.state.db,
            NewUser {
                email,
                username,
                password_hash: hash_password(TEST_PASSWORD).unwrap(),
                display_name: None,
            },
        )
        .await
        .expect("Failed to seed user");
        user.id
    }

    /// Flip `users.is_active` directly, as an operator would.
    pub async fn set_active(&self, user_id: &str, is_active: bool) {
        entity::user::Entity::update_many()
            .col_expr(entity::user::Column::IsActive, Expr::value(is_active))
            .filter(entity::user::Column::Id.eq(user_id))
            .exec(&self.state.db)
            .await
            .expect("Failed to update user");
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/auth/login",
            None,
            serde_json::json!({"email": email, "password": password}),
        )
        .await
    }

    /// Seed a user and log in as them.
    pub async fn session(&self, email: &str, username: &str) -> Session {
        let user_id = self.seed_user(email, username).await;
        let resp = self.login(email, TEST_PASSWORD).await;
        resp.assert_status(StatusCode::OK);
        let json: serde_json::Value = resp.json();

        Session {
            user_id,
            access_token: json["access_token"].as_str().unwrap().to_string(),
            refresh_token: json["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> TestResponse {
        self.post_json(
            "/api/auth/refresh",
            None,
            serde_json::json!({"refresh_token": refresh_token}),
        )
        .await
    }

    // ── Scan helpers ─────────────────────────────────────────────────────

    pub async fn create_scan(&self, token: &str, body: serde_json::Value) -> TestResponse {
        self.post_json("/api/scans", Some(token), body).await
    }
}

pub fn build_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
