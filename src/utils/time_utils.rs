use std::time::Duration;

use chrono::DateTime;

pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render a provider epoch-millisecond timestamp for display (UTC).
pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => dt.format(STANDARD_TIME_FORMAT).to_string(),
        None => format!("invalid({})", epoch_ms),
    }
}

/// Coarse human duration: `45s`, `3m`, `2h`, `5d`, `4M`, `1Y 2M`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }
    let months = days / 30;
    if months < 12 {
        return format!("{}M", months);
    }
    format!("{}Y {}M", months / 12, months % 12)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_buckets() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(180)), "3m");
        assert_eq!(format_duration(Duration::from_secs(2 * 3600)), "2h");
        assert_eq!(format_duration(Duration::from_secs(5 * 86400)), "5d");
        assert_eq!(format_duration(Duration::from_secs(400 * 86400)), "1Y 1M");
    }

    #[test]
    fn test_epoch_ms_to_utc() {
        assert_eq!(epoch_ms_to_utc(0), "1970-01-01 00:00");
        assert_eq!(epoch_ms_to_utc(1_700_000_000_000), "2023-11-14 22:13");
    }
}
