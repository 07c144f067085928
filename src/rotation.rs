//! proxywarden/src/rotation.rs
//! C10: periodic upstream rotation. Grounded on `main.py`'s
//! `toggle_ip_rotation`/`rotation_timer`/`switch_to_next_proxy` — snapshot then
//! cycle-by-index, disabling does not revert the currently active upstream.

use crate::error::WardenError;
use crate::registry::UpstreamRegistry;
use crate::types::{PoolEntry, PoolStatus, Scheme, UpstreamDescriptor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct RotationHandle {
    stop: Arc<AtomicBool>,
}

impl RotationHandle {
    pub fn disable(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn descriptor_of(entry: &PoolEntry) -> Result<UpstreamDescriptor, WardenError> {
    let (host, port) = entry
        .address
        .rsplit_once(':')
        .ok_or_else(|| WardenError::Config(format!("malformed pool address: {}", entry.address)))?;
    Ok(UpstreamDescriptor {
        scheme: entry.scheme,
        host: host.to_owned(),
        port: port
            .parse()
            .map_err(|_| WardenError::Config(format!("malformed pool port: {}", entry.address)))?,
    })
}

/// Snapshots `pool`'s available entries, publishes the first immediately, then
/// advances the index every `interval` seconds. Returns a handle to disable.
/// Fails if the snapshot is empty.
pub fn enable(
    pool: &[PoolEntry],
    interval: Duration,
    registry: Arc<UpstreamRegistry>,
) -> Result<RotationHandle, WardenError> {
    let snapshot: Vec<UpstreamDescriptor> = pool
        .iter()
        .filter(|e| e.status == PoolStatus::Available)
        .map(descriptor_of)
        .collect::<Result<_, _>>()?;

    if snapshot.is_empty() {
        return Err(WardenError::Config("no available entries to rotate".into()));
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handle = RotationHandle {
        stop: Arc::clone(&stop),
    };

    registry.publish(Some(snapshot[0].clone()));

    tokio::spawn(async move {
        let mut index = 0usize;
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; index 0 already published above
        loop {
            ticker.tick().await;
            if stop.load(Ordering::SeqCst) {
                return;
            }
            index = (index + 1) % snapshot.len();
            registry.publish(Some(snapshot[index].clone()));
        }
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Anonymity;

    fn entry(address: &str) -> PoolEntry {
        PoolEntry {
            status: PoolStatus::Available,
            score: 100.0,
            anonymity: Anonymity::Elite,
            scheme: Scheme::Socks5,
            address: address.to_owned(),
            latency_ms: Some(10.0),
            speed_mbps: Some(10.0),
            country: String::new(),
            city: String::new(),
            fail_count: 0,
        }
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let registry = Arc::new(UpstreamRegistry::new());
        let result = enable(&[], Duration::from_secs(1), registry);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn enable_publishes_first_entry_immediately() {
        let registry = Arc::new(UpstreamRegistry::new());
        let pool = vec![entry("10.0.0.1:1080"), entry("10.0.0.2:1080")];
        let _handle = enable(&pool, Duration::from_secs(60), Arc::clone(&registry)).unwrap();
        assert_eq!(registry.read().unwrap().host, "10.0.0.1");
    }

    #[tokio::test]
    async fn rotates_to_next_entry_after_interval() {
        let registry = Arc::new(UpstreamRegistry::new());
        let pool = vec![entry("10.0.0.1:1080"), entry("10.0.0.2:1080")];
        let _handle = enable(&pool, Duration::from_millis(20), Arc::clone(&registry)).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.read().unwrap().host, "10.0.0.2");
    }

    #[tokio::test]
    async fn disable_stops_rotation_without_reverting() {
        let registry = Arc::new(UpstreamRegistry::new());
        let pool = vec![entry("10.0.0.1:1080"), entry("10.0.0.2:1080")];
        let handle = enable(&pool, Duration::from_millis(20), Arc::clone(&registry)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.disable();
        let at_disable = registry.read().unwrap().host.clone();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.read().unwrap().host, at_disable);
    }
}
