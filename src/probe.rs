//! proxywarden/src/probe.rs
//! C1: per-candidate probes (connectivity/latency, anonymity, geolocation,
//! throughput). Transliterated from `Connectivity.py`'s
//! `test_connectivity`/`get_anonymity`/`get_geo_info`/`get_speed` onto async
//! `reqwest` calls routed through each candidate as its own proxy.

use crate::error::WardenError;
use crate::pubip::PublicIpCache;
use crate::types::{Anonymity, ProbeResult, ProxyCandidate};
use std::future::Future;
use std::time::{Duration, Instant};

const LATENCY_URL: &str = "https://www.google.com/generate_204";
const ANONYMITY_URL: &str = "https://httpbin.org/get";
const GEO_URL: &str = "https://myip.ipip.net/";
const THROUGHPUT_URL: &str = "https://speed.cloudflare.com/__down?bytes=10000000";

const ATTEMPTS: u32 = 3;
const BACKOFF: Duration = Duration::from_millis(500);

/// Shared "N attempts, fixed backoff, per-attempt timeout" skeleton every probe
/// in this module is built on.
pub async fn with_retry<T, F, Fut>(attempts: u32, backoff: Duration, mut op: F) -> Result<T, WardenError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WardenError>>,
{
    let mut last_err = None;
    for attempt in 0..attempts {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                last_err = Some(e);
                if attempt + 1 < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| WardenError::Probe("no attempts made".into())))
}

fn proxy_client(candidate: &ProxyCandidate, timeout: Duration) -> Result<reqwest::Client, WardenError> {
    let proxy_url = format!("{}", candidate);
    let proxy = reqwest::Proxy::all(proxy_url).map_err(WardenError::Request)?;
    reqwest::Client::builder()
        .proxy(proxy)
        .timeout(timeout)
        .build()
        .map_err(WardenError::Request)
}

async fn probe_connectivity(candidate: &ProxyCandidate) -> Result<f64, WardenError> {
    with_retry(ATTEMPTS, BACKOFF, || async {
        let client = proxy_client(candidate, Duration::from_secs(2))?;
        let start = Instant::now();
        let resp = client.get(LATENCY_URL).send().await?;
        if resp.status().is_success() || resp.status().as_u16() == 204 {
            Ok(start.elapsed().as_secs_f64() * 1000.0)
        } else {
            Err(WardenError::Probe(format!("unexpected status {}", resp.status())))
        }
    })
    .await
}

async fn probe_anonymity(candidate: &ProxyCandidate, own_ip: &str) -> Anonymity {
    let result: Result<Anonymity, WardenError> = with_retry(ATTEMPTS, BACKOFF, || async {
        let client = proxy_client(candidate, Duration::from_secs(3))?;
        let resp = client.get(ANONYMITY_URL).send().await?;
        let headers = resp.headers().clone();
        let body: serde_json::Value = resp.json().await?;

        let forwarded = body
            .get("headers")
            .and_then(|h| h.get("X-Forwarded-For"))
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| {
                body.get("origin")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned)
                    .unwrap_or_default()
            });
        let ips: Vec<&str> = forwarded.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        let has_via = headers.contains_key("via")
            || body
                .get("headers")
                .and_then(|h| h.get("Via"))
                .is_some();

        if ips.iter().any(|ip| *ip == own_ip) {
            Ok(Anonymity::Transparent)
        } else if ips.len() > 1 || has_via {
            Ok(Anonymity::Anonymous)
        } else {
            Ok(Anonymity::Elite)
        }
    })
    .await;
    result.unwrap_or(Anonymity::Unknown)
}

async fn probe_geo(candidate: &ProxyCandidate) -> (String, String) {
    let result: Result<(String, String), WardenError> = with_retry(ATTEMPTS, BACKOFF, || async {
        let client = proxy_client(candidate, Duration::from_secs(3))?;
        let text = client.get(GEO_URL).send().await?.text().await?;
        parse_geo_line(&text).ok_or_else(|| WardenError::Probe("unparseable geo response".into()))
    })
    .await;
    result.unwrap_or_default()
}

/// Parses the reference geo-echo format `来自于：<country> <region> <city>`,
/// served by `myip.ipip.net`.
fn parse_geo_line(text: &str) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix("来自于：")?;
    let mut parts = rest.split_whitespace();
    let country = parts.next()?.to_owned();
    let _region = parts.next();
    let city = parts.next().unwrap_or_default().to_owned();
    Some((country, city))
}

async fn probe_throughput(candidate: &ProxyCandidate) -> f64 {
    use futures::StreamExt;

    let result: Result<f64, WardenError> = with_retry(ATTEMPTS, BACKOFF, || async {
        let client = proxy_client(candidate, Duration::from_secs(10))?;
        let resp = client.get(THROUGHPUT_URL).send().await?;
        let start = Instant::now();
        let mut stream = resp.bytes_stream();
        let mut bytes: u64 = 0;
        while let Some(chunk) = stream.next().await {
            bytes += chunk?.len() as u64;
        }
        let secs = start.elapsed().as_secs_f64().max(0.001);
        let mbps = (bytes as f64 / secs) * 8.0 / 1_000_000.0 * 1000.0;
        Ok((mbps * 10.0).round() / 10.0)
    })
    .await;
    result.unwrap_or(0.0)
}

/// Runs all four probes for a single candidate and folds them into a [`ProbeResult`].
pub async fn probe_candidate(candidate: ProxyCandidate, public_ip: &PublicIpCache) -> ProbeResult {
    let latency_ms = match probe_connectivity(&candidate).await {
        Ok(ms) => ms,
        Err(_) => return ProbeResult::unreachable(candidate),
    };

    let own_ip = public_ip.get().await.unwrap_or_default();
    let (anonymity, (country, city)) = tokio::join!(probe_anonymity(&candidate, &own_ip), probe_geo(&candidate));

    let throughput_mbps = if latency_ms <= 5000.0 {
        probe_throughput(&candidate).await
    } else {
        0.0
    };

    let score = crate::scoring::score(latency_ms, anonymity, throughput_mbps);
    ProbeResult {
        candidate,
        reachable: true,
        latency_ms,
        anonymity,
        throughput_mbps,
        country,
        city,
        score,
    }
}
