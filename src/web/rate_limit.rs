use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::web::{AppState, responses::AppError};

/// Above this many tracked clients, expired windows are dropped on the next check.
const PRUNE_THRESHOLD: usize = 4096;

/// Fixed-window request counter keyed by client IP.
///
/// Requests without a known peer address share one bucket.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    hits: Mutex<HashMap<Option<IpAddr>, Window>>,
}

struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    /// A `max_requests` of zero disables limiting.
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request from `client`, returning the seconds to wait when it is over the limit.
    pub async fn check(&self, client: Option<IpAddr>, now: Instant) -> Result<(), u64> {
        if self.max_requests == 0 {
            return Ok(());
        }

        let mut hits = self.hits.lock().await;
        if hits.len() > PRUNE_THRESHOLD {
            hits.retain(|_, window| now.duration_since(window.started) < self.window);
        }

        let entry = hits.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let reset_at = entry.started + self.window;
            let remaining = reset_at.saturating_duration_since(now);
            return Err(remaining.as_secs().max(1));
        }

        entry.count += 1;
        Ok(())
    }
}

pub async fn limit_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Err(retry_after) = state.rate_limiter().check(client, Instant::now()).await {
        warn!(client = ?client, retry_after, "rate limit exceeded");
        return AppError::TooManyRequests(retry_after).into_response();
    }

    next.run(request).await
}
