//! proxywarden/src/error.rs
//! Crate-wide error taxonomy. Module boundaries return `WardenError`; the CLI
//! boundary wraps these in `anyhow::Context` for human-readable chains.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WardenError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("socks5 protocol violation: {0}")]
    Socks5(String),

    #[error("http proxy protocol violation: {0}")]
    HttpProxy(String),

    #[error("upstream dial failed: {0}")]
    Dial(String),

    #[error("pool store error: {0}")]
    Pool(String),

    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}
