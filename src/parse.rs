//! Parsing utilities for human-readable configuration values

use std::time::Duration;

use crate::error::ConfigError;

/// Parse human-readable size string (e.g., "10MB", "1GB", "512KB")
///
/// # Supported formats
/// - `"1GB"` - gigabytes
/// - `"10MB"` - megabytes
/// - `"512KB"` - kilobytes
/// - `"1024B"` or `"1024"` - bytes
pub fn parse_size(s: &str) -> Result<u64, ConfigError> {
    let upper = s.trim().to_ascii_uppercase();
    let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    num_str
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| ConfigError::invalid("size", s, "expected a number with B, KB, MB or GB"))
}

/// Parse duration string (e.g., "30s", "5m", "1h", "100ms")
///
/// # Supported formats
/// - `"1h"` - hours
/// - `"5m"` - minutes
/// - `"30s"` or `"30"` - seconds
/// - `"100ms"` - milliseconds
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let lower = s.trim().to_ascii_lowercase();
    let (num_str, multiplier) = if let Some(n) = lower.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = lower.strip_suffix('s') {
        (n, 1000)
    } else if let Some(n) = lower.strip_suffix('m') {
        (n, 60 * 1000)
    } else if let Some(n) = lower.strip_suffix('h') {
        (n, 60 * 60 * 1000)
    } else {
        (lower.as_str(), 1000)
    };

    num_str
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .map(Duration::from_millis)
        .ok_or_else(|| ConfigError::invalid("duration", s, "expected a number with ms, s, m or h"))
}

/// Parse a boolean flag ("true"/"false", "1"/"0", "yes"/"no", "on"/"off")
pub fn parse_bool(s: &str) -> Result<bool, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid("flag", s, "expected true or false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1KB"), Ok(1024));
        assert_eq!(parse_size("10MB"), Ok(10 * 1024 * 1024));
        assert_eq!(parse_size("1GB"), Ok(1024 * 1024 * 1024));
        assert_eq!(parse_size("512B"), Ok(512));
        assert_eq!(parse_size("100"), Ok(100));
        assert_eq!(parse_size("  5mb  "), Ok(5 * 1024 * 1024));
    }

    #[test]
    fn test_parse_size_rejects_garbage() {
        assert!(parse_size("ten megabytes").is_err());
        assert!(parse_size("").is_err());
        assert!(parse_size("-1MB").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("100ms"), Ok(Duration::from_millis(100)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("15m"), Ok(Duration::from_secs(900)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("60"), Ok(Duration::from_secs(60)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("off"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }
}
