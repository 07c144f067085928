//! proxywarden/src/pool.rs
//! C4 + A2: pool merge/evict/sort semantics and JSON persistence. Grounded on
//! `main.py`'s `process_results` (key = `UPPER(scheme)://address`, fail_count
//! carry-over, eviction at 5, sort by score desc, pretty JSON write).

use crate::error::WardenError;
use crate::types::{Anonymity, PoolEntry, PoolStatus, ProbeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const EVICT_AT: u32 = 5;

#[derive(Debug, Serialize, Deserialize)]
struct PoolEntryJson {
    status: String,
    score: f64,
    anonymity: String,
    protocol: String,
    address: String,
    latency: String,
    speed: String,
    country: String,
    city: String,
    #[serde(default)]
    fail_count: u32,
}

impl From<&PoolEntry> for PoolEntryJson {
    fn from(e: &PoolEntry) -> Self {
        Self {
            status: e.status.pool_label().to_owned(),
            score: e.score,
            anonymity: e.anonymity.pool_label().to_owned(),
            protocol: e.scheme.as_str().to_uppercase(),
            address: e.address.clone(),
            latency: e.latency_text(),
            speed: e.speed_text(),
            country: e.country.clone(),
            city: e.city.clone(),
            fail_count: e.fail_count,
        }
    }
}

impl PoolEntryJson {
    fn into_entry(self) -> Result<PoolEntry, WardenError> {
        let scheme: crate::types::Scheme = self.protocol.parse()?;
        Ok(PoolEntry {
            status: PoolStatus::from_pool_label(&self.status),
            score: self.score,
            anonymity: Anonymity::from_pool_label(&self.anonymity),
            scheme,
            address: self.address,
            latency_ms: parse_ms(&self.latency),
            speed_mbps: parse_mbps(&self.speed),
            country: self.country,
            city: self.city,
            fail_count: self.fail_count,
        })
    }
}

fn parse_ms(text: &str) -> Option<f64> {
    text.strip_suffix("ms").and_then(|s| s.parse().ok())
}

fn parse_mbps(text: &str) -> Option<f64> {
    text.strip_suffix(" MB/s").and_then(|s| s.parse().ok())
}

/// Loads the pool file. A missing file yields an empty pool rather than an
/// error — no built-in seed data ships with this crate.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<PoolEntry>, WardenError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let raw: Vec<PoolEntryJson> =
        serde_json::from_str(&contents).map_err(|e| WardenError::Pool(format!("parse error: {e}")))?;
    raw.into_iter().map(PoolEntryJson::into_entry).collect()
}

/// Persists the pool, pretty-printed, UTF-8, 2-space indent.
pub fn save(path: impl AsRef<Path>, entries: &[PoolEntry]) -> Result<(), WardenError> {
    let raw: Vec<PoolEntryJson> = entries.iter().map(PoolEntryJson::from).collect();
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(&raw, &mut ser).map_err(|e| WardenError::Pool(format!("serialize error: {e}")))?;
    std::fs::write(path, buf)?;
    Ok(())
}

/// Merges a batch of probe results into `pool` in place, applying fail-streak
/// tracking and eviction, then re-sorts by score descending. Returns the keys
/// of any entries evicted by this merge.
pub fn merge(pool: &mut Vec<PoolEntry>, results: &[ProbeResult]) -> Vec<String> {
    let mut by_key: HashMap<String, PoolEntry> =
        pool.drain(..).map(|e| (e.key(), e)).collect();
    let mut evicted = Vec::new();

    for result in results {
        let key = result.candidate.pool_key();
        let prev_fail_count = by_key.get(&key).map_or(0, |e| e.fail_count);

        let fail_count = if result.reachable { 0 } else { prev_fail_count + 1 };
        if fail_count >= EVICT_AT {
            by_key.remove(&key);
            evicted.push(key);
            continue;
        }

        by_key.insert(
            key,
            PoolEntry {
                status: if result.reachable {
                    PoolStatus::Available
                } else {
                    PoolStatus::Unavailable
                },
                score: result.score,
                anonymity: result.anonymity,
                scheme: result.candidate.scheme,
                address: result.candidate.address(),
                latency_ms: result.reachable.then_some(result.latency_ms),
                speed_mbps: result.reachable.then_some(result.throughput_mbps),
                country: result.country.clone(),
                city: result.city.clone(),
                fail_count,
            },
        );
    }

    let mut merged: Vec<PoolEntry> = by_key.into_values().collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    *pool = merged;
    evicted
}
