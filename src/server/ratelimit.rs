//! Fixed-window request rate limiting.

use std::net::IpAddr;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use hyper::HeaderMap;

const GLOBAL_KEY: &str = "*";

/// Stale windows are purged once the map grows past this.
const PURGE_THRESHOLD: usize = 4096;

/// How clients are bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKey {
    /// One bucket for every request
    All,
    /// `X-Real-IP`, then the first `X-Forwarded-For` entry, then the peer
    RealIp,
    /// Peer address of the connection
    PeerIp,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub key: RateLimitKey,
    pub request_limit: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            key: RateLimitKey::PeerIp,
            request_limit: 100,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per key within fixed windows.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Bucket key for a request.
    pub fn key_for(&self, headers: &HeaderMap, peer: IpAddr) -> String {
        match self.config.key {
            RateLimitKey::All => GLOBAL_KEY.to_string(),
            RateLimitKey::PeerIp => peer.to_string(),
            RateLimitKey::RealIp => real_ip(headers).unwrap_or_else(|| peer.to_string()),
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Decision {
        if self.windows.len() > PURGE_THRESHOLD {
            self.purge_expired(now);
        }

        let window = self.config.window;
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.config.request_limit {
            let elapsed = now.saturating_duration_since(entry.started);
            return Decision::Limited {
                retry_after: window.saturating_sub(elapsed),
            };
        }

        entry.count += 1;
        Decision::Allowed
    }

    fn purge_expired(&self, now: Instant) {
        let window = self.config.window;
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.windows.len()
    }
}

fn real_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-real-ip")
        .or_else(|| header("x-forwarded-for").and_then(|v| v.split(',').next()).map(str::trim))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
