//! proxywarden/src/registry.rs
//! C9: single source of truth for the currently-active upstream. A publish is
//! atomic and wait-free for readers; no in-flight pipe observes the change.

use crate::types::UpstreamDescriptor;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

#[derive(Default)]
pub struct UpstreamRegistry {
    current: ArcSwapOption<UpstreamDescriptor>,
}

impl UpstreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::from(None),
        }
    }

    /// `None` means direct (no upstream).
    #[must_use]
    pub fn read(&self) -> Option<Arc<UpstreamDescriptor>> {
        self.current.load_full()
    }

    pub fn publish(&self, desc: Option<UpstreamDescriptor>) {
        self.current.store(desc.map(Arc::new));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scheme;

    #[test]
    fn starts_direct() {
        let reg = UpstreamRegistry::new();
        assert!(reg.read().is_none());
    }

    #[test]
    fn publish_is_observed_by_subsequent_reads() {
        let reg = UpstreamRegistry::new();
        reg.publish(Some(UpstreamDescriptor {
            scheme: Scheme::Socks5,
            host: "10.0.0.1".into(),
            port: 1080,
        }));
        let read = reg.read().unwrap();
        assert_eq!(read.host, "10.0.0.1");

        reg.publish(Some(UpstreamDescriptor {
            scheme: Scheme::Socks5,
            host: "10.0.0.2".into(),
            port: 1080,
        }));
        // The earlier Arc clone is unaffected by the later publish.
        assert_eq!(read.host, "10.0.0.1");
        assert_eq!(reg.read().unwrap().host, "10.0.0.2");
    }
}
