//! proxywarden/src/types.rs
//! Core data structures shared across the validator and the forwarding server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three upstream wire protocols this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
    Socks5,
}

impl Scheme {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Scheme {
    type Err = crate::error::WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            "socks5" => Ok(Scheme::Socks5),
            other => Err(crate::error::WardenError::Config(format!(
                "unknown proxy scheme: {other}"
            ))),
        }
    }
}

/// A bulk-imported candidate, parsed from `"<scheme>://<host>:<port>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyCandidate {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl ProxyCandidate {
    pub fn parse(line: &str) -> Result<Self, crate::error::WardenError> {
        let url = url::Url::parse(line.trim())
            .map_err(|e| crate::error::WardenError::Config(format!("invalid candidate url: {e}")))?;
        let scheme: Scheme = url.scheme().parse()?;
        let host = url
            .host_str()
            .ok_or_else(|| crate::error::WardenError::Config("candidate url has no host".into()))?
            .to_owned();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| crate::error::WardenError::Config("candidate url has no port".into()))?;
        Ok(Self { scheme, host, port })
    }

    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn pool_key(&self) -> String {
        format!("{}://{}", self.scheme.as_str().to_uppercase(), self.address())
    }
}

impl fmt::Display for ProxyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.address())
    }
}

/// Anonymity class produced by the header-echo probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Anonymity {
    Elite,
    Anonymous,
    Transparent,
    #[default]
    Unknown,
}

impl Anonymity {
    /// The Chinese-language label used by the persisted pool schema.
    #[must_use]
    pub fn pool_label(&self) -> &'static str {
        match self {
            Anonymity::Elite => "高匿",
            Anonymity::Anonymous => "普匿",
            Anonymity::Transparent => "透明",
            Anonymity::Unknown => "",
        }
    }

    #[must_use]
    pub fn from_pool_label(label: &str) -> Self {
        match label {
            "高匿" => Anonymity::Elite,
            "普匿" => Anonymity::Anonymous,
            "透明" => Anonymity::Transparent,
            _ => Anonymity::Unknown,
        }
    }
}

/// Outcome of probing a single candidate (C1/C2 output, C3 input).
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub candidate: ProxyCandidate,
    pub reachable: bool,
    pub latency_ms: f64,
    pub anonymity: Anonymity,
    pub throughput_mbps: f64,
    pub country: String,
    pub city: String,
    pub score: f64,
}

impl ProbeResult {
    /// An unreachable result short-circuits after the connectivity probe: every other
    /// field stays at its zero value and the score is computed from that zero state.
    #[must_use]
    pub fn unreachable(candidate: ProxyCandidate) -> Self {
        let score = crate::scoring::score(0.0, Anonymity::Unknown, 0.0);
        Self {
            candidate,
            reachable: false,
            latency_ms: 0.0,
            anonymity: Anonymity::Unknown,
            throughput_mbps: 0.0,
            country: String::new(),
            city: String::new(),
            score,
        }
    }
}

/// Status of a persisted pool entry, derived from the most recent probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    Available,
    Unavailable,
}

impl PoolStatus {
    #[must_use]
    pub fn pool_label(&self) -> &'static str {
        match self {
            PoolStatus::Available => "可用",
            PoolStatus::Unavailable => "不可用",
        }
    }

    #[must_use]
    pub fn from_pool_label(label: &str) -> Self {
        match label {
            "可用" => PoolStatus::Available,
            _ => PoolStatus::Unavailable,
        }
    }
}

/// A persisted pool record. Field names mirror the JSON schema but this is the
/// Rust-native record shape, not a dynamically-typed dict.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub status: PoolStatus,
    pub score: f64,
    pub anonymity: Anonymity,
    pub scheme: Scheme,
    pub address: String,
    pub latency_ms: Option<f64>,
    pub speed_mbps: Option<f64>,
    pub country: String,
    pub city: String,
    pub fail_count: u32,
}

impl PoolEntry {
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}://{}", self.scheme.as_str().to_uppercase(), self.address)
    }

    #[must_use]
    pub fn latency_text(&self) -> String {
        match self.latency_ms {
            Some(ms) => format!("{ms:.1}ms"),
            None => String::new(),
        }
    }

    #[must_use]
    pub fn speed_text(&self) -> String {
        match self.speed_mbps {
            Some(mbps) => format!("{mbps:.1} MB/s"),
            None => String::new(),
        }
    }
}

/// The currently-active upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamDescriptor {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl UpstreamDescriptor {
    pub fn parse(url: &str) -> Result<Self, crate::error::WardenError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| crate::error::WardenError::Config(format!("invalid upstream url: {e}")))?;
        let scheme: Scheme = parsed.scheme().parse()?;
        let host = parsed
            .host_str()
            .ok_or_else(|| crate::error::WardenError::Config("upstream url has no host".into()))?
            .to_owned();
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| crate::error::WardenError::Config("upstream url has no port".into()))?;
        Ok(Self { scheme, host, port })
    }
}

impl fmt::Display for UpstreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_candidate_url() {
        let c = ProxyCandidate::parse("socks5://10.0.0.1:1080").unwrap();
        assert_eq!(c.scheme, Scheme::Socks5);
        assert_eq!(c.host, "10.0.0.1");
        assert_eq!(c.port, 1080);
        assert_eq!(c.pool_key(), "SOCKS5://10.0.0.1:1080");
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(ProxyCandidate::parse("ftp://10.0.0.1:21").is_err());
    }

    #[test]
    fn anonymity_label_round_trip() {
        for a in [
            Anonymity::Elite,
            Anonymity::Anonymous,
            Anonymity::Transparent,
        ] {
            assert_eq!(Anonymity::from_pool_label(a.pool_label()), a);
        }
    }
}
