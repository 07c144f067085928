//! proxywarden/src/config.rs
//! YAML configuration loading (A1). Any read or parse failure falls back to
//! defaults rather than aborting startup — mirrors `original_source`'s
//! `load_config`, which never lets a bad config file stop the server.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyWardenConfig {
    pub socks5_port: u16,
    pub http_port: u16,
}

impl Default for ProxyWardenConfig {
    fn default() -> Self {
        Self {
            socks5_port: 1080,
            http_port: 1081,
        }
    }
}

impl ProxyWardenConfig {
    /// Load from `path`; any I/O or parse error is logged and swallowed in favor
    /// of the default config.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_norway::from_str::<ProxyWardenConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::info!(path = %path.display(), error = %e, "no config file, using defaults");
                Self::default()
            }
        }
    }
}
