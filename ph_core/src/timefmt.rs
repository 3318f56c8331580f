//! Relative time labels and log-view time ranges.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::PhError;
use crate::sample::Sample;
use crate::util::MILLIS_PER_DAY;

/// Human label for how long before `now_ms` the instant `ts_ms` was:
/// "12 sec ago", "3 min ago", "5 hr ago", "1 day ago", "4 days ago", and the
/// calendar date once it is 30 days or older.
pub fn time_ago(now_ms: i64, ts_ms: i64) -> String {
    let secs = now_ms.saturating_sub(ts_ms).max(0) / 1_000;
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;
    if secs < 60 {
        format!("{secs} sec ago")
    } else if mins < 60 {
        format!("{mins} min ago")
    } else if hours < 24 {
        format!("{hours} hr ago")
    } else if days < 30 {
        let plural = if days > 1 { "s" } else { "" };
        format!("{days} day{plural} ago")
    } else {
        format_date(ts_ms)
    }
}

/// `YYYY-MM-DD` in UTC.
pub fn format_date(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map_or_else(|| ts_ms.to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// `HH:MM` in UTC, used for chart and "last reading at" labels.
pub fn format_clock(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map_or_else(|| ts_ms.to_string(), |d| d.format("%H:%M").to_string())
}

/// Preset ranges for the reading log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    Day,
    Week,
    Month,
}

impl TimeRange {
    pub fn duration_ms(&self) -> i64 {
        match self {
            TimeRange::Day => MILLIS_PER_DAY,
            TimeRange::Week => 7 * MILLIS_PER_DAY,
            TimeRange::Month => 30 * MILLIS_PER_DAY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "24h",
            TimeRange::Week => "7d",
            TimeRange::Month => "month",
        }
    }

    /// Samples strictly newer than `now - range`.
    pub fn filter<'a>(&self, samples: &'a [Sample], now_ms: i64) -> &'a [Sample] {
        let cutoff = now_ms.saturating_sub(self.duration_ms());
        let from = samples.partition_point(|s| s.timestamp_ms() <= cutoff);
        &samples[from..]
    }
}

impl FromStr for TimeRange {
    type Err = PhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" | "day" => Ok(TimeRange::Day),
            "7d" | "week" => Ok(TimeRange::Week),
            "month" | "30d" => Ok(TimeRange::Month),
            other => Err(PhError::InvalidInput(format!(
                "unknown time range '{other}' (expected 24h, 7d or month)"
            ))),
        }
    }
}

impl core::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn labels_by_magnitude() {
        assert_eq!(time_ago(NOW, NOW), "0 sec ago");
        assert_eq!(time_ago(NOW, NOW - 59_999), "59 sec ago");
        assert_eq!(time_ago(NOW, NOW - 60_000), "1 min ago");
        assert_eq!(time_ago(NOW, NOW - 3 * 3_600_000), "3 hr ago");
        assert_eq!(time_ago(NOW, NOW - MILLIS_PER_DAY), "1 day ago");
        assert_eq!(time_ago(NOW, NOW - 4 * MILLIS_PER_DAY), "4 days ago");
    }

    #[test]
    fn old_timestamps_show_date() {
        assert_eq!(time_ago(NOW, 0), "1970-01-01");
    }

    #[test]
    fn future_timestamps_clamp_to_zero() {
        assert_eq!(time_ago(NOW, NOW + 5_000), "0 sec ago");
    }

    #[test]
    fn range_parse_and_filter_is_strict() {
        assert_eq!("7d".parse::<TimeRange>().expect("parse"), TimeRange::Week);
        assert!("year".parse::<TimeRange>().is_err());
        let samples = [
            Sample::new(NOW - MILLIS_PER_DAY, 7.0).expect("sample"),
            Sample::new(NOW - MILLIS_PER_DAY + 1, 7.1).expect("sample"),
        ];
        let kept = TimeRange::Day.filter(&samples, NOW);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].value(), 7.1);
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
    }
}
