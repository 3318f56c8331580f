//! Common time helpers for ph_core.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: i64 = 1_000;
/// Number of milliseconds in one day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Seconds to milliseconds, saturating at `i64::MAX`.
#[inline]
pub fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(MILLIS_PER_SEC)
}

/// Unsigned milliseconds to signed, saturating at `i64::MAX`.
#[inline]
pub fn ms_to_i64(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Retention window for `days` days in milliseconds.
#[inline]
pub fn days_to_ms(days: u32) -> i64 {
    i64::from(days).saturating_mul(MILLIS_PER_DAY)
}
