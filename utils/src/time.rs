//! Time formatting helpers.

use vouch_types::Timestamp;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// "3m 20s ago" style age of `then` relative to `now`.
pub fn format_age(then: Timestamp, now: Timestamp) -> String {
    format!("{} ago", format_duration(then.elapsed_since(now)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_range() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(200), "3m 20s");
        assert_eq!(format_duration(7_260), "2h 1m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }

    #[test]
    fn age_saturates_for_future_timestamps() {
        assert_eq!(format_age(Timestamp::new(100), Timestamp::new(50)), "0s ago");
        assert_eq!(format_age(Timestamp::new(100), Timestamp::new(160)), "1m 0s ago");
    }
}
