//! TTL-based caching for API responses, plus the upstream cache indicator.

use dashmap::DashMap;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

/// Response headers an upstream cache may use to report hit/miss.
const CACHE_HEADERS: [&str; 3] = ["x-cache", "cf-cache-status", "x-cache-status"];

/// Where a response came from, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheIndicator {
    /// Served from this process's cache without a request.
    Local,
    /// Upstream reported a cache hit.
    Hit,
    /// Upstream reported a cache miss.
    Miss,
    /// Upstream did not say.
    Unknown,
}

impl CacheIndicator {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        for name in CACHE_HEADERS {
            let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
                continue;
            };
            let upper = value.to_ascii_uppercase();
            if upper.contains("HIT") {
                return CacheIndicator::Hit;
            }
            if upper.contains("MISS") || upper.contains("EXPIRED") || upper.contains("BYPASS") {
                return CacheIndicator::Miss;
            }
        }
        CacheIndicator::Unknown
    }
}

/// A cache key derived from a request URL.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_url(url: &str) -> Self {
        let digest = Sha256::digest(url.as_bytes());
        Self(
            digest[..16]
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}...", &self.0[..8.min(self.0.len())])
    }
}

#[derive(Clone)]
struct CachedResponse {
    body: Value,
    cached_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_fresh(&self) -> bool {
        self.cached_at.elapsed() < self.ttl
    }
}

/// Thread-safe cache of decoded JSON bodies.
pub struct ResponseCache {
    entries: DashMap<CacheKey, CachedResponse>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Gets a cached body if it exists and hasn't expired.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.get(key).and_then(|entry| {
            if entry.is_fresh() {
                Some(entry.body.clone())
            } else {
                drop(entry);
                self.entries.remove(key);
                None
            }
        })
    }

    pub fn insert(&self, key: CacheKey, body: Value) {
        self.insert_with_ttl(key, body, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: CacheKey, body: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.entries.insert(
            key,
            CachedResponse {
                body,
                cached_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &CacheKey) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes expired entries from the cache.
    pub fn cleanup_expired(&self) {
        self.entries.retain(|_, entry| entry.is_fresh());
    }

    pub fn stats(&self) -> CacheStats {
        let mut total = 0;
        let mut expired = 0;

        for entry in self.entries.iter() {
            total += 1;
            if !entry.is_fresh() {
                expired += 1;
            }
        }

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}
