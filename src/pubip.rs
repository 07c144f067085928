//! proxywarden/src/pubip.rs
//! A3: lazy, TTL-refreshed cache of the host's own public IP. Repurposes the
//! teacher's `cache.rs` TTL/`Instant` expiry pattern (there applied to
//! router/MOTD decisions) for a single scalar value used by the anonymity
//! classifier (C1). Never blocks process startup — the first probe that needs
//! it pays the refresh cost.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_TTL: Duration = Duration::from_secs(600);
const ECHO_URL: &str = "https://httpbin.org/ip";

struct Cached {
    ip: String,
    fetched_at: Instant,
}

pub struct PublicIpCache {
    ttl: Duration,
    inner: Mutex<Option<Cached>>,
    client: reqwest::Client,
}

impl PublicIpCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(None),
            client: reqwest::Client::new(),
        }
    }

    /// Returns the cached IP, refreshing it first if absent or expired.
    pub async fn get(&self) -> Result<String, crate::error::WardenError> {
        let mut guard = self.inner.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.ip.clone());
            }
        }
        let ip = self.fetch().await?;
        *guard = Some(Cached {
            ip: ip.clone(),
            fetched_at: Instant::now(),
        });
        Ok(ip)
    }

    async fn fetch(&self) -> Result<String, crate::error::WardenError> {
        #[derive(serde::Deserialize)]
        struct Origin {
            origin: String,
        }
        let resp: Origin = self
            .client
            .get(ECHO_URL)
            .timeout(Duration::from_secs(3))
            .send()
            .await?
            .json()
            .await?;
        Ok(resp.origin.split(',').next().unwrap_or_default().trim().to_owned())
    }
}

impl Default for PublicIpCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_cache_has_no_value() {
        let cache = PublicIpCache::new();
        assert!(cache.inner.try_lock().unwrap().is_none());
    }
}
