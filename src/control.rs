//! proxywarden/src/control.rs
//! C11: control surface. Commands are serialized (at most one structural
//! change in flight) behind a single `tokio::sync::Mutex`. Grounded on
//! `main.py`'s `switch_to_single`/`switch_to_multi` confirm-then-stop-listeners
//! flow. Multi-hop is recognized and rejected, never implemented (§9).

use crate::config::ProxyWardenConfig;
use crate::error::WardenError;
use crate::pool::{self, merge};
use crate::pubip::PublicIpCache;
use crate::registry::UpstreamRegistry;
use crate::rotation::{self, RotationHandle};
use crate::types::{PoolEntry, ProxyCandidate, UpstreamDescriptor};
use crate::{httpproxy, socks5, validator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

/// Whether the server chains through one upstream or several. Only
/// `SingleHop` is implemented; `MultiHop` exists purely so a request for it
/// can be recognized and rejected with a clear error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamMode {
    SingleHop,
    #[allow(dead_code)]
    MultiHop,
}

struct RunningListeners {
    socks5_stop: oneshot::Sender<()>,
    http_stop: oneshot::Sender<()>,
}

pub struct ControlSurface {
    pool_path: PathBuf,
    config: ProxyWardenConfig,
    registry: Arc<UpstreamRegistry>,
    public_ip: Arc<PublicIpCache>,
    pool: Mutex<Vec<PoolEntry>>,
    listeners: Mutex<Option<RunningListeners>>,
    rotation: Mutex<Option<RotationHandle>>,
    mode: Mutex<UpstreamMode>,
}

impl ControlSurface {
    #[must_use]
    pub fn new(pool_path: PathBuf, config: ProxyWardenConfig) -> Self {
        let pool = pool::load(&pool_path).unwrap_or_default();
        Self {
            pool_path,
            config,
            registry: Arc::new(UpstreamRegistry::new()),
            public_ip: Arc::new(PublicIpCache::new()),
            pool: Mutex::new(pool),
            listeners: Mutex::new(None),
            rotation: Mutex::new(None),
            mode: Mutex::new(UpstreamMode::SingleHop),
        }
    }

    /// `import <file>`: reads candidate lines, one `"<scheme>://<host>:<port>"` per line.
    pub async fn import(&self, path: impl AsRef<std::path::Path>) -> Result<Vec<ProxyCandidate>, WardenError> {
        let contents = std::fs::read_to_string(path)?;
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(ProxyCandidate::parse)
            .collect()
    }

    /// `retest`: validates `candidates`, merges into the pool, persists, returns eviction keys.
    pub async fn retest(&self, candidates: Vec<ProxyCandidate>) -> Result<Vec<String>, WardenError> {
        let results = validator::validate_all(candidates, &self.public_ip, None).await;
        let mut pool = self.pool.lock().await;
        let evicted = merge(&mut pool, &results);
        if let Err(e) = pool::save(&self.pool_path, &pool) {
            tracing::warn!(error = %e, "failed to persist pool after retest");
        }
        Ok(evicted)
    }

    /// `serve`: starts both listeners. No-op if already running.
    pub async fn serve(&self) -> Result<(), WardenError> {
        let mut listeners = self.listeners.lock().await;
        if listeners.is_some() {
            return Ok(());
        }
        let (socks5_stop_tx, socks5_stop_rx) = oneshot::channel();
        let (http_stop_tx, http_stop_rx) = oneshot::channel();

        let registry = Arc::clone(&self.registry);
        let socks5_port = self.config.socks5_port;
        tokio::spawn(async move {
            if let Err(e) = socks5::serve(socks5_port, registry, socks5_stop_rx).await {
                tracing::error!(error = %e, "socks5 listener stopped");
            }
        });

        let registry = Arc::clone(&self.registry);
        let http_port = self.config.http_port;
        tokio::spawn(async move {
            if let Err(e) = httpproxy::serve(http_port, registry, http_stop_rx).await {
                tracing::error!(error = %e, "http listener stopped");
            }
        });

        *listeners = Some(RunningListeners {
            socks5_stop: socks5_stop_tx,
            http_stop: http_stop_tx,
        });
        Ok(())
    }

    /// `stop`: stops both listeners if running.
    pub async fn stop(&self) {
        if let Some(running) = self.listeners.lock().await.take() {
            let _ = running.socks5_stop.send(());
            let _ = running.http_stop.send(());
        }
    }

    /// `switch <upstream-url>`: publishes a new upstream descriptor.
    pub fn switch(&self, upstream_url: &str) -> Result<(), WardenError> {
        let desc = UpstreamDescriptor::parse(upstream_url)?;
        self.registry.publish(Some(desc));
        Ok(())
    }

    /// `rotate enable <interval-secs>`.
    pub async fn rotate_enable(&self, interval_secs: u64) -> Result<(), WardenError> {
        let pool = self.pool.lock().await;
        let handle = rotation::enable(
            &pool,
            std::time::Duration::from_secs(interval_secs),
            Arc::clone(&self.registry),
        )?;
        *self.rotation.lock().await = Some(handle);
        Ok(())
    }

    /// `rotate disable`.
    pub async fn rotate_disable(&self) {
        if let Some(handle) = self.rotation.lock().await.take() {
            handle.disable();
        }
    }

    /// Switching chain modes while listeners run requires stopping them first;
    /// multi-hop itself is always rejected.
    pub async fn set_mode(&self, mode: UpstreamMode) -> Result<(), WardenError> {
        if mode == UpstreamMode::MultiHop {
            return Err(WardenError::Unsupported(
                "multi-hop chaining is not implemented".into(),
            ));
        }
        if self.listeners.lock().await.is_some() {
            self.stop().await;
        }
        *self.mode.lock().await = mode;
        Ok(())
    }

    pub async fn status(&self) -> Vec<PoolEntry> {
        self.pool.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multi_hop_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let control = ControlSurface::new(dir.path().join("pool.json"), ProxyWardenConfig::default());
        let result = control.set_mode(UpstreamMode::MultiHop).await;
        assert!(matches!(result, Err(WardenError::Unsupported(_))));
    }

    #[tokio::test]
    async fn switch_publishes_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let control = ControlSurface::new(dir.path().join("pool.json"), ProxyWardenConfig::default());
        control.switch("socks5://10.0.0.1:1080").unwrap();
        assert_eq!(control.registry.read().unwrap().host, "10.0.0.1");
    }

    #[tokio::test]
    async fn rotate_enable_fails_on_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        let control = ControlSurface::new(dir.path().join("pool.json"), ProxyWardenConfig::default());
        let result = control.rotate_enable(1).await;
        assert!(result.is_err());
    }
}
