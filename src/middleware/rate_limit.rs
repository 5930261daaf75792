use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::utils::token::Claims;

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed one-second windows, one per caller (token subject, or a shared
/// anonymous bucket when no claims are present).
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    windows: Arc<Mutex<HashMap<String, WindowState>>>,
}

impl RateLimiter {
    fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Drop stale callers so the map does not grow without bound.
        if windows.len() > 10_000 {
            windows.retain(|_, w| now.duration_since(w.start) < WINDOW);
        }

        let window = windows.entry(key.to_string()).or_insert(WindowState {
            start: now,
            count: 0,
        });
        if now.duration_since(window.start) >= WINDOW {
            window.start = now;
            window.count = 0;
        }
        if window.count < self.rps {
            window.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = req
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    if !state.allow(&key) {
        tracing::warn!(caller = %key, path = %req.uri().path(), "AI rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate_limit_exceeded" })),
        )
            .into_response();
    }
    next.run(req).await
}

pub fn new_rps_state(rps: u32) -> RateLimiter {
    RateLimiter::new(rps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_caller_has_its_own_window() {
        let limiter = new_rps_state(2);
        let now = Instant::now();
        assert!(limiter.allow_at("alice", now));
        assert!(limiter.allow_at("alice", now));
        assert!(!limiter.allow_at("alice", now));
        assert!(limiter.allow_at("bob", now));
    }

    #[test]
    fn window_resets_after_a_second() {
        let limiter = new_rps_state(1);
        let now = Instant::now();
        assert!(limiter.allow_at("alice", now));
        assert!(!limiter.allow_at("alice", now + Duration::from_millis(500)));
        assert!(limiter.allow_at("alice", now + Duration::from_millis(1500)));
    }

    #[test]
    fn zero_rps_still_admits_one_request() {
        let limiter = new_rps_state(0);
        assert!(limiter.allow("x"));
        assert!(!limiter.allow("x"));
    }
}
