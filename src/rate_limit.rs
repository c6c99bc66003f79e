use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Extensions, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

/// Endpoint classes with independent counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LimitClass {
    Api,
    Auth,
    Scan,
    AccountCreation,
}

#[derive(Clone, Copy, Debug)]
pub struct LimitPolicy {
    pub class: LimitClass,
    pub max_requests: u32,
    pub window: Duration,
    /// Responses below 400 are not counted against the caller.
    pub skip_successful: bool,
    pub message: &'static str,
}

impl LimitPolicy {
    pub const API: LimitPolicy = LimitPolicy {
        class: LimitClass::Api,
        max_requests: 100,
        window: Duration::from_secs(15 * 60),
        skip_successful: false,
        message: "Too many requests from this IP, please try again later.",
    };

    pub const AUTH: LimitPolicy = LimitPolicy {
        class: LimitClass::Auth,
        max_requests: 5,
        window: Duration::from_secs(15 * 60),
        skip_successful: true,
        message: "Too many authentication attempts, please try again after 15 minutes.",
    };

    pub const SCAN: LimitPolicy = LimitPolicy {
        class: LimitClass::Scan,
        max_requests: 30,
        window: Duration::from_secs(60),
        skip_successful: false,
        message: "Too many scan requests, please slow down.",
    };

    pub const ACCOUNT_CREATION: LimitPolicy = LimitPolicy {
        class: LimitClass::AccountCreation,
        max_requests: 3,
        window: Duration::from_secs(60 * 60),
        skip_successful: false,
        message: "Too many accounts created from this IP, please try again after an hour.",
    };
}

struct Window {
    started: Instant,
    hits: u32,
}

struct CounterInner {
    windows: HashMap<(LimitClass, String), Window>,
    last_cleanup: Instant,
}

/// Shared fixed-window counters keyed by (endpoint class, client IP).
/// Cloning shares the same counters.
#[derive(Clone)]
pub struct CounterStore {
    state: Arc<Mutex<CounterInner>>,
}

impl Default for CounterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CounterInner {
                windows: HashMap::new(),
                last_cleanup: Instant::now(),
            })),
        }
    }

    /// Count a hit and report whether it is within the limit. Increment and
    /// check happen under one lock.
    pub async fn hit(&self, policy: &LimitPolicy, key: &str) -> bool {
        let mut inner = self.state.lock().await;
        let now = Instant::now();

        // Periodic cleanup of expired windows (every 60s)
        if now.duration_since(inner.last_cleanup) > Duration::from_secs(60) {
            inner
                .windows
                .retain(|_, w| now.duration_since(w.started) < Duration::from_secs(60 * 60));
            inner.last_cleanup = now;
        }

        let window = inner
            .windows
            .entry((policy.class, key.to_string()))
            .or_insert(Window {
                started: now,
                hits: 0,
            });

        if now.duration_since(window.started) >= policy.window {
            window.started = now;
            window.hits = 0;
        }

        window.hits = window.hits.saturating_add(1);
        window.hits <= policy.max_requests
    }

    /// Take back one hit, used when a successful response is not counted.
    pub async fn undo(&self, policy: &LimitPolicy, key: &str) {
        let mut inner = self.state.lock().await;
        if let Some(window) = inner.windows.get_mut(&(policy.class, key.to_string())) {
            window.hits = window.hits.saturating_sub(1);
        }
    }
}

/// A limiter for one endpoint class over a shared [`CounterStore`].
#[derive(Clone)]
pub struct RateLimiter {
    store: CounterStore,
    policy: LimitPolicy,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(store: CounterStore, policy: LimitPolicy, trust_proxy_headers: bool) -> Self {
        Self {
            store,
            policy,
            trust_proxy_headers,
        }
    }
}

/// Client IP. With `trust_proxy_headers`, the first hop of X-Forwarded-For,
/// then X-Real-IP; otherwise, or when neither is set, the peer address from
/// `ConnectInfo`.
pub fn client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_proxy_headers: bool,
) -> Option<String> {
    trust_proxy_headers
        .then(|| forwarded_ip(headers))
        .flatten()
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Axum middleware that rate-limits by client IP, falling back to a shared
/// bucket when no address is known.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_ip(req.headers(), req.extensions(), limiter.trust_proxy_headers)
        .unwrap_or_else(|| "unknown".to_string());

    if !limiter.store.hit(&limiter.policy, &key).await {
        tracing::warn!(
            class = ?limiter.policy.class,
            ip = %key,
            "Rate limit exceeded"
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(serde_json::json!({
                "success": false,
                "error": limiter.policy.message,
            })),
        )
            .into_response();
    }

    let response = next.run(req).await;

    if limiter.policy.skip_successful && response.status().as_u16() < 400 {
        limiter.store.undo(&limiter.policy, &key).await;
    }

    response
}
