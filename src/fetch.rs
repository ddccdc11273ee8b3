//! Fetch boundary for trending pages.
//!
//! The HTTP client is wrapped by two explicit policy objects rather than any
//! implicit call interception:
//! - [`RateLimiter`]: a blocking window limiter (default 30 calls / 60s) that
//!   sleeps out the remainder of the window once the quota is spent;
//! - [`PageCache`]: a TTL cache of page bodies keyed by URL hash, so repeated
//!   fetches within one window reuse the markup.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info};
use sha2::{Digest, Sha256};

use crate::error::TrackerError;
use crate::types::TimeRange;

const BASE_URL: &str = "https://github.com/trending";
const USER_AGENT: &str = "GitHub-Trending-Tracker";

/// Client-side quota: at most `calls` acquisitions per `period`, enforced by
/// blocking the caller until the window rolls over.
#[derive(Debug)]
pub struct RateLimiter {
    calls: u32,
    period: Duration,
    made: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(calls: u32, period: Duration) -> Self {
        Self {
            calls: calls.max(1),
            period,
            made: 0,
            window_start: Instant::now(),
        }
    }

    /// Take one slot from the quota, sleeping until the current window
    /// expires if it is exhausted.
    pub fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.period {
            self.made = 0;
            self.window_start = Instant::now();
        } else if self.made >= self.calls {
            let wait = self.period - elapsed;
            debug!("Rate limit reached, sleeping {:?}", wait);
            thread::sleep(wait);
            self.made = 0;
            self.window_start = Instant::now();
        }
        self.made += 1;
    }

    /// Slots left in the current window.
    pub fn remaining(&self) -> u32 {
        if self.window_start.elapsed() >= self.period {
            self.calls
        } else {
            self.calls.saturating_sub(self.made)
        }
    }
}

/// TTL cache of fetched page bodies, keyed by URL hash.
#[derive(Debug)]
pub struct PageCache {
    ttl: Duration,
    entries: HashMap<String, (Instant, String)>,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, url: &str) -> Option<String> {
        let key = cache_key(url);
        let stale = match self.entries.get(&key) {
            Some((stored, body)) if stored.elapsed() < self.ttl => return Some(body.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            self.entries.remove(&key);
        }
        None
    }

    pub fn put(&mut self, url: &str, body: String) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(cache_key(url), (Instant::now(), body));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// HTTP GET capability for trending pages, with rate limiting and caching
/// composed in front of the network call.
pub struct TrendingClient {
    client: reqwest::blocking::Client,
    token: Option<String>,
    limiter: RateLimiter,
    cache: PageCache,
}

impl TrendingClient {
    pub fn new(token: Option<String>, limiter: RateLimiter, cache: PageCache) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            token,
            limiter,
            cache,
        })
    }

    /// `https://github.com/trending[/<language>]?since=<daily|weekly|monthly>`
    pub fn trending_url(language: Option<&str>, since: TimeRange) -> String {
        match language {
            Some(language) => format!("{}/{}?since={}", BASE_URL, language, since.as_str()),
            None => format!("{}?since={}", BASE_URL, since.as_str()),
        }
    }

    /// Fetch one trending page, returning its markup. Non-2xx responses and
    /// transport errors surface as [`TrackerError::Fetch`].
    pub fn fetch_trending(
        &mut self,
        language: Option<&str>,
        since: TimeRange,
    ) -> Result<String, TrackerError> {
        let url = Self::trending_url(language, since);

        if let Some(body) = self.cache.get(&url) {
            debug!("Cache hit for {}", url);
            return Ok(body);
        }

        self.limiter.acquire();
        info!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request
            .send()
            .map_err(|e| TrackerError::fetch(&url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::fetch(&url, format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .text()
            .map_err(|e| TrackerError::fetch(&url, e.to_string()))?;
        self.cache.put(&url, body.clone());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_trending_urls() {
        assert_eq!(
            TrendingClient::trending_url(None, TimeRange::Daily),
            "https://github.com/trending?since=daily"
        );
        assert_eq!(
            TrendingClient::trending_url(Some("rust"), TimeRange::Weekly),
            "https://github.com/trending/rust?since=weekly"
        );
        assert_eq!(
            TrendingClient::trending_url(Some("c++"), TimeRange::Monthly),
            "https://github.com/trending/c++?since=monthly"
        );
    }

    #[test]
    fn rate_limiter_tracks_window_quota() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(40));
        assert_eq!(limiter.remaining(), 2);
        limiter.acquire();
        limiter.acquire();
        assert_eq!(limiter.remaining(), 0);

        // Window rollover restores the quota without blocking.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(limiter.remaining(), 2);
        limiter.acquire();
        assert_eq!(limiter.remaining(), 1);
    }

    #[test]
    fn rate_limiter_blocks_when_exhausted() {
        let mut limiter = RateLimiter::new(1, Duration::from_millis(30));
        limiter.acquire();
        let start = Instant::now();
        limiter.acquire(); // Must wait out the window.
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn page_cache_hits_within_ttl() {
        let mut cache = PageCache::new(Duration::from_secs(60));
        assert!(cache.get("https://github.com/trending").is_none());
        cache.put("https://github.com/trending", "<html/>".to_string());
        assert_eq!(cache.get("https://github.com/trending").as_deref(), Some("<html/>"));
        // Different URL, different key.
        assert!(cache.get("https://github.com/trending/rust").is_none());
    }

    #[test]
    fn page_cache_expires_entries() {
        let mut cache = PageCache::new(Duration::from_millis(10));
        cache.put("u", "body".to_string());
        thread::sleep(Duration::from_millis(20));
        assert!(cache.get("u").is_none());
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[test]
    fn zero_ttl_disables_caching() {
        let mut cache = PageCache::new(Duration::ZERO);
        cache.put("u", "body".to_string());
        assert!(cache.get("u").is_none());
        assert_eq!(cache.len(), 0);
    }
}
