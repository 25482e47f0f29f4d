use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use dashmap::DashMap;

/// Fixed-window request counter keyed by client address.
///
/// State is per process: counters are not shared across instances and reset on restart.
pub struct FixedWindowLimiter {
    max: u32,
    window: Duration,
    buckets: DashMap<String, (u32, Instant)>,
}

impl FixedWindowLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            buckets: DashMap::new(),
        }
    }

    /// Count one hit for `key`. Returns `Err(retry_after_secs)` once the window is full.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), u64> {
        let mut entry = self.buckets.entry(key.to_owned()).or_insert((0, now));
        let (count, started) = entry.value_mut();

        if now.duration_since(*started) >= self.window {
            *count = 0;
            *started = now;
        }

        if *count >= self.max {
            let remaining = self.window.saturating_sub(now.duration_since(*started));
            return Err(remaining.as_secs().max(1));
        }

        *count += 1;
        Ok(())
    }

    /// Drop buckets whose window has elapsed.
    pub fn prune(&self) {
        let now = Instant::now();
        self.buckets
            .retain(|_, (_, started)| now.duration_since(*started) < self.window);
    }
}

/// Client key for rate limiting: first `X-Forwarded-For` entry, else the peer address.
pub fn client_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
