use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::error::AppError;

/// Buckets idle this long are full again and can be dropped.
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(10 * 60);

/// Key used when the client cannot be identified.
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, Copy)]
struct Bucket {
    last_update: Instant,
    tokens: f32,
}

/// Token-bucket rate limiter keyed by client.
///
/// Clients are told apart by `X-Forwarded-For` (first hop) or `X-Real-IP`;
/// anything else shares one bucket.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    rate_per_sec: f32,
    burst_size: f32,
}

impl RateLimiter {
    pub fn new(rate_per_sec: f32, burst_size: f32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rate_per_sec,
            burst_size: burst_size.max(1.0),
        }
    }

    /// Take one token from `key`'s bucket.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut guard = self.buckets.lock().unwrap();
        let bucket = guard.entry(key.to_string()).or_insert(Bucket {
            last_update: now,
            tokens: self.burst_size,
        });

        let elapsed = now.duration_since(bucket.last_update).as_secs_f32();
        let tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst_size);
        bucket.last_update = now;

        if tokens >= 1.0 {
            bucket.tokens = tokens - 1.0;
            true
        } else {
            // Time passage still counts when denying.
            bucket.tokens = tokens;
            false
        }
    }

    /// Drop buckets that have not been touched for a while.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.buckets.lock().unwrap();
        let before = guard.len();
        guard.retain(|_, b| now.duration_since(b.last_update) < IDLE_BUCKET_TTL);
        before - guard.len()
    }
}

/// Best-effort client identity from proxy headers.
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS)
        .to_string()
}

/// Reject requests over the configured rate with 429.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if state.config.resilience.rate_limit_enabled {
        let key = client_key(req.headers());
        if !state.rate_limiter.check(&key) {
            tracing::warn!(name: "rate_limit.rejected", client = %key, path = %req.uri().path(), "Rate limit exceeded");
            return AppError::new(StatusCode::TOO_MANY_REQUESTS, "Too many requests. Please slow down.")
                .into_response();
        }
    }
    next.run(req).await
}
