//! Per-IP fixed-window throttling for the login route

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use shared::error::{AppError, ErrorCode};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::state::AppState;

const WINDOW: Duration = Duration::from_secs(60);

/// Entries idle longer than this are dropped by [`RateLimiter::cleanup`]
const RETENTION: Duration = Duration::from_secs(300);

struct IpEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    /// Requests allowed per IP per window; 0 disables limiting
    max_per_window: u32,
    entries: Arc<Mutex<HashMap<String, IpEntry>>>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32) -> Self {
        Self {
            max_per_window,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns `true` if the request is allowed, `false` if rate-limited.
    pub async fn check(&self, ip: &str) -> bool {
        if self.max_per_window == 0 {
            return true;
        }

        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let entry = entries.entry(ip.to_owned()).or_insert_with(|| IpEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= WINDOW {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count += 1;
        entry.count <= self.max_per_window
    }

    pub async fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .retain(|_, entry| now.duration_since(entry.window_start) < RETENTION);
    }
}

/// Client IP: first X-Forwarded-For entry, then the peer address
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let ip = first.trim();
        if !ip.is_empty() {
            return ip.to_owned();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

pub async fn login_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);
    if !state.rate_limiter.check(&ip).await {
        tracing::warn!(%ip, "Login rate limit exceeded");
        return Err(AppError::new(ErrorCode::TooManyAttempts));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_window_limits_and_resets() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.check("1.2.3.4").await);
        assert!(limiter.check("1.2.3.4").await);
        assert!(!limiter.check("1.2.3.4").await);
        assert!(limiter.check("5.6.7.8").await);

        tokio::time::advance(WINDOW).await;
        assert!(limiter.check("1.2.3.4").await);
    }

    #[tokio::test]
    async fn test_zero_disables() {
        let limiter = RateLimiter::new(0);
        for _ in 0..100 {
            assert!(limiter.check("1.2.3.4").await);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_stale_entries() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.check("1.2.3.4").await);
        tokio::time::advance(RETENTION).await;
        limiter.cleanup().await;
        assert!(limiter.entries.lock().await.is_empty());
    }
}
