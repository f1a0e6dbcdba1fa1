//! Fixed-window rate limiting for mutating routes
//!
//! Each key gets a counter that resets when its window has fully elapsed.
//! Expired buckets are dropped by a periodic sweep so the map only holds
//! clients seen within the last window.

use super::AppState;
use crate::error::CoreError;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Key prefix for upload/delete traffic
pub const MUTATE_PURPOSE: &str = "mutate";

/// Outcome of a limiter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allow { remaining: u32 },
    Deny { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

/// In-process fixed-window counter keyed by `purpose:client`
pub struct FixedWindowLimiter {
    window: Duration,
    max_requests: u32,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl FixedWindowLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        FixedWindowLimiter {
            window,
            max_requests,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Count one request against `key`
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    pub(crate) fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut buckets = self.lock();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            window_start: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(bucket.window_start);
        if elapsed >= self.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        if bucket.count >= self.max_requests {
            let remaining = self.window.saturating_sub(elapsed);
            return RateDecision::Deny {
                retry_after_secs: ceil_secs(remaining).max(1),
            };
        }

        bucket.count += 1;
        RateDecision::Allow {
            remaining: self.max_requests - bucket.count,
        }
    }

    /// Drop buckets whose window has elapsed; returns how many were removed
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, b| now.saturating_duration_since(b.window_start) < self.window);
        before - buckets.len()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

/// Spawn the periodic sweep of expired buckets
pub fn spawn_sweeper(
    limiter: Arc<FixedWindowLimiter>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = limiter.sweep();
            if removed > 0 {
                tracing::debug!(
                    removed,
                    remaining = limiter.len(),
                    "Swept expired rate-limit buckets"
                );
            }
        }
    })
}

/// Identify the client: first `X-Forwarded-For` hop when trusted, otherwise
/// the peer IP
fn client_address(request: &Request<Body>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limit middleware for mutating routes
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_address(&request, state.trust_forwarded_for);
    let key = format!("{}:{}", MUTATE_PURPOSE, client);

    match state.limiter.check(&key) {
        RateDecision::Allow { .. } => next.run(request).await,
        RateDecision::Deny { retry_after_secs } => {
            tracing::warn!(client = %client, retry_after_secs, "Rate limit exceeded");
            CoreError::RateLimited { retry_after_secs }.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thirty_first_request_denied() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 30);
        let start = Instant::now();

        for i in 0..30 {
            let at = start + Duration::from_secs(i);
            assert!(matches!(
                limiter.check_at("mutate:1.2.3.4", at),
                RateDecision::Allow { .. }
            ));
        }

        match limiter.check_at("mutate:1.2.3.4", start + Duration::from_millis(30_500)) {
            RateDecision::Deny { retry_after_secs } => {
                assert!(retry_after_secs <= 60);
                assert_eq!(retry_after_secs, 30);
            }
            other => panic!("expected deny, got {:?}", other),
        }
    }

    #[test]
    fn test_window_expiry_resets_counter() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        limiter.check_at("k", start);
        limiter.check_at("k", start);
        assert!(matches!(
            limiter.check_at("k", start + Duration::from_secs(59)),
            RateDecision::Deny { .. }
        ));

        assert_eq!(
            limiter.check_at("k", start + Duration::from_secs(60)),
            RateDecision::Allow { remaining: 1 }
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1);
        let now = Instant::now();
        assert!(matches!(limiter.check_at("mutate:a", now), RateDecision::Allow { .. }));
        assert!(matches!(limiter.check_at("mutate:b", now), RateDecision::Allow { .. }));
        assert!(matches!(limiter.check_at("mutate:a", now), RateDecision::Deny { .. }));
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 1);
        let start = Instant::now();
        limiter.check_at("k", start);
        assert_eq!(
            limiter.check_at("k", start + Duration::from_millis(59_999)),
            RateDecision::Deny { retry_after_secs: 1 }
        );
    }

    #[test]
    fn test_sweep_drops_expired_buckets() {
        let limiter = FixedWindowLimiter::new(Duration::from_secs(60), 5);
        let start = Instant::now();
        limiter.check_at("old", start);
        limiter.check_at("fresh", start + Duration::from_secs(50));
        assert_eq!(limiter.len(), 2);

        assert_eq!(limiter.sweep_at(start + Duration::from_secs(70)), 1);
        assert_eq!(limiter.len(), 1);
        assert!(!limiter.is_empty());
    }

    #[test]
    fn test_client_address_sources() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_address(&request, true), "203.0.113.9");
        assert_eq!(client_address(&request, false), "unknown");

        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 5], 5555))));
        assert_eq!(client_address(&request, true), "192.168.1.5");
    }
}
