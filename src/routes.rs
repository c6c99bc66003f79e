use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, LimitPolicy, RateLimiter};
use crate::security::with_security_headers;
use crate::AppState;

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let origin = if allowed_origins.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .filter_map(|o| HeaderValue::from_str(o.trim()).ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router(state: AppState) -> Router {
    // Per-IP fixed windows, one class per limiter, all over the shared counter store
    let limiter = |policy| {
        RateLimiter::new(
            state.counters.clone(),
            policy,
            state.config.trust_proxy_headers,
        )
    };
    let api_limiter = limiter(LimitPolicy::API);
    let auth_limiter = limiter(LimitPolicy::AUTH);
    let signup_limiter = limiter(LimitPolicy::ACCOUNT_CREATION);
    let scan_limiter = limiter(LimitPolicy::SCAN);

    // Login and refresh: only failed attempts count
    let session_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route_layer(middleware::from_fn_with_state(
            auth_limiter,
            rate_limit_middleware,
        ));

    let signup_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route_layer(middleware::from_fn_with_state(
            signup_limiter,
            rate_limit_middleware,
        ));

    let auth_routes = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/logout-all", post(handlers::auth::logout_all))
        .merge(session_routes)
        .merge(signup_routes);

    let user_routes = Router::new().route(
        "/me",
        get(handlers::user::get_profile)
            .patch(handlers::user::update_profile)
            .delete(handlers::user::delete_account),
    );

    let scan_routes = Router::new()
        .route(
            "/",
            post(handlers::scans::create)
                .layer(middleware::from_fn_with_state(
                    scan_limiter,
                    rate_limit_middleware,
                ))
                .get(handlers::scans::list),
        )
        .route(
            "/:id",
            get(handlers::scans::get).delete(handlers::scans::delete),
        )
        .route("/:id/favorite", post(handlers::scans::toggle_favorite))
        .route("/:id/notes", patch(handlers::scans::update_notes));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/scans", scan_routes)
        .route_layer(middleware::from_fn_with_state(
            api_limiter,
            rate_limit_middleware,
        ));

    let router = Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .route("/terms", get(handlers::legal::terms))
        .route("/privacy", get(handlers::legal::privacy))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .with_state(state);

    with_security_headers(router)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
