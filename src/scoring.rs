//! proxywarden/src/scoring.rs
//! C3: pure composite scoring. Grounded on `Connectivity.py`'s
//! `calc_latency_score`/`calc_anonymity_score`/`calc_speed_score`; the weight
//! constants from that source are unused dead code and are not carried forward.

use crate::types::Anonymity;

fn latency_sub(latency_ms: f64) -> f64 {
    let secs = latency_ms / 1000.0;
    if secs <= 0.5 {
        100.0
    } else if secs <= 1.0 {
        80.0
    } else if secs <= 2.0 {
        60.0
    } else if secs <= 5.0 {
        40.0
    } else {
        20.0
    }
}

fn anonymity_sub(anonymity: Anonymity) -> f64 {
    match anonymity {
        Anonymity::Elite => 100.0,
        Anonymity::Anonymous => 70.0,
        Anonymity::Transparent => 40.0,
        Anonymity::Unknown => 0.0,
    }
}

fn throughput_sub(mbps: f64) -> f64 {
    if mbps <= 0.0 {
        0.0
    } else if mbps >= 50.0 {
        100.0
    } else if mbps >= 10.0 {
        80.0
    } else if mbps >= 5.0 {
        60.0
    } else {
        40.0
    }
}

/// Composite score in `0..=300`, rounded to one decimal.
#[must_use]
pub fn score(latency_ms: f64, anonymity: Anonymity, throughput_mbps: f64) -> f64 {
    let total = latency_sub(latency_ms) + anonymity_sub(anonymity) + throughput_sub(throughput_mbps);
    (total * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_tunnel_scoring_example() {
        // latency=0.3s, anonymity=Elite, mbps=12 -> 100+100+80 = 280.0
        assert_eq!(score(300.0, Anonymity::Elite, 12.0), 280.0);
    }

    #[test]
    fn zero_throughput_is_zero_sub_score() {
        assert_eq!(throughput_sub(0.0), 0.0);
    }

    #[test]
    fn unreachable_floor_score() {
        assert_eq!(score(0.0, Anonymity::Unknown, 0.0), 100.0);
    }

    #[test]
    fn score_is_bounded() {
        let hi = score(1.0, Anonymity::Elite, 1000.0);
        assert!(hi <= 300.0);
        let lo = score(999_999.0, Anonymity::Unknown, 0.0);
        assert!(lo >= 0.0);
    }
}
