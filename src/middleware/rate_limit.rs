// SPDX-License-Identifier: MIT

//! Per-client fixed-window rate limiting for the /api surface.
//!
//! Clients are keyed by the first `X-Forwarded-For` hop when present (the
//! service normally runs behind a proxy), falling back to the socket peer
//! address. Counters live in a `DashMap`; a background task sweeps stale
//! windows so the map does not grow without bound.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;

use crate::AppState;

/// 100 requests per 15 minutes, matching the deployed limiter.
pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(15 * 60);

struct Counter {
    window_start: Instant,
    count: u32,
}

/// Fixed-window request counter per client key.
pub struct RateLimiter {
    counters: DashMap<String, Counter>,
    limit: u32,
    window: Duration,
}

enum Decision {
    Allow,
    Limited { retry_after: Duration },
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            limit,
            window,
        }
    }

    /// Periodically drop counters whose window has passed.
    pub fn spawn_cleanup_task(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                self.counters
                    .retain(|_, counter| now.duration_since(counter.window_start) < self.window);
            }
        });
    }

    fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut counter = self.counters.entry(key.to_string()).or_insert(Counter {
            window_start: now,
            count: 0,
        });

        if now.duration_since(counter.window_start) >= self.window {
            counter.window_start = now;
            counter.count = 0;
        }

        if counter.count >= self.limit {
            let elapsed = now.duration_since(counter.window_start);
            return Decision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }

        counter.count += 1;
        Decision::Allow
    }
}

/// Middleware enforcing the limiter on routes it is layered onto.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match state.rate_limiter.check(&key) {
        Decision::Allow => next.run(request).await,
        Decision::Limited { retry_after } => {
            let retry_after_secs = retry_after.as_secs().max(1);
            tracing::warn!(
                client = %key,
                retry_after_secs,
                "Rate limit exceeded"
            );

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": "too_many_requests" })),
            )
                .into_response();
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}

fn client_key(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));

        assert!(matches!(limiter.check("10.0.0.1"), Decision::Allow));
        assert!(matches!(limiter.check("10.0.0.1"), Decision::Allow));
        assert!(matches!(
            limiter.check("10.0.0.1"),
            Decision::Limited { .. }
        ));
    }

    #[test]
    fn clients_are_counted_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(matches!(limiter.check("10.0.0.1"), Decision::Allow));
        assert!(matches!(limiter.check("10.0.0.2"), Decision::Allow));
        assert!(matches!(
            limiter.check("10.0.0.1"),
            Decision::Limited { .. }
        ));
    }

    #[tokio::test]
    async fn window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));

        assert!(matches!(limiter.check("10.0.0.1"), Decision::Allow));
        assert!(matches!(
            limiter.check("10.0.0.1"),
            Decision::Limited { .. }
        ));

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(matches!(limiter.check("10.0.0.1"), Decision::Allow));
    }
}
