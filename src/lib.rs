//! # Stats Processor
//!
//! Aggregates player match histories into per-race and overall stats and
//! caches the results with a time-to-live.
//!
//! ## Architecture
//!
//! - **models**: Wire and cache data structures (matches, summaries)
//! - **calculate**: Match scoring and per-player aggregation
//! - **batch**: Parallel aggregation of a batch of players
//! - **storage**: Cache stores (MongoDB, JSONL, in-memory) and the bounded writer
//! - **service**: The compute-stats operation and its response envelope
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod batch;
pub mod calculate;
pub mod config;
pub mod models;
pub mod service;
pub mod storage;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_hours() {
        assert_eq!(parse_duration("6h"), Some(Duration::from_secs(21600)));
    }

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration("30m"), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_parse_duration_default_seconds() {
        assert_eq!(parse_duration("120"), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration("abc"), None);
    }

    #[test]
    fn test_parse_duration_empty() {
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_parse_duration_zero() {
        assert_eq!(parse_duration("0s"), Some(Duration::from_secs(0)));
    }

    #[test]
    fn test_parse_duration_large() {
        assert_eq!(parse_duration("9999h"), Some(Duration::from_secs(35996400)));
    }

    #[test]
    fn test_parse_duration_overflow() {
        assert_eq!(parse_duration(&format!("{}h", u64::MAX)), None);
    }

    #[test]
    fn test_parse_duration_cache_defaults() {
        assert_eq!(parse_duration("10m"), Some(Duration::from_secs(600)));
        assert_eq!(parse_duration(" 30s "), Some(Duration::from_secs(30)));
    }
}
