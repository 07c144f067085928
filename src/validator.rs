//! proxywarden/src/validator.rs
//! C2: bounded-concurrency validator pool. Grounded on `suprohub-novaprox`'s
//! `ping_proxies`/`test_proxy_chunk` (`stream::iter().map().buffer_unordered()`)
//! combined with `Connectivity.py`'s `test_proxies` progress-callback semantics.

use crate::pubip::PublicIpCache;
use crate::types::{ProbeResult, ProxyCandidate};
use futures::stream::{self, StreamExt};

/// Probes run with at most this many in flight at once.
pub const MAX_CONCURRENCY: usize = 50;

/// Invoked once per completed candidate, in completion order: `(completed, total, result)`.
/// `result` is `None` only if the probe task itself panicked — individual probe
/// failures are reported as an unreachable `ProbeResult`, not `None`.
pub type ProgressSink<'a> = dyn Fn(usize, usize, Option<&ProbeResult>) + Send + Sync + 'a;

/// Probes every candidate with up to [`MAX_CONCURRENCY`] in flight, invoking
/// `sink` after each completes. Returns all results, in completion order.
pub async fn validate_all(
    candidates: Vec<ProxyCandidate>,
    public_ip: &PublicIpCache,
    sink: Option<&ProgressSink<'_>>,
) -> Vec<ProbeResult> {
    let total = candidates.len();
    let mut completed = 0usize;
    let mut results = Vec::with_capacity(total);

    let mut stream = stream::iter(candidates)
        .map(|candidate| async move { crate::probe::probe_candidate(candidate, public_ip).await })
        .buffer_unordered(MAX_CONCURRENCY);

    while let Some(result) = stream.next().await {
        completed += 1;
        if let Some(sink) = sink {
            sink(completed, total, Some(&result));
        }
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let cache = PublicIpCache::new();
        let results = validate_all(Vec::new(), &cache, None).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn progress_sink_sees_every_candidate_once() {
        let cache = PublicIpCache::new();
        let candidates = vec![
            ProxyCandidate::parse("http://127.0.0.1:1").unwrap(),
            ProxyCandidate::parse("http://127.0.0.1:2").unwrap(),
        ];
        let seen = std::sync::atomic::AtomicUsize::new(0);
        let sink: &ProgressSink<'_> = &|_completed, total, result| {
            assert_eq!(total, 2);
            assert!(result.is_some());
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        };
        let results = validate_all(candidates, &cache, Some(sink)).await;
        assert_eq!(results.len(), 2);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
