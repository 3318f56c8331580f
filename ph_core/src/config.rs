//! Runtime configuration for the monitor.

use crate::debounce::DEFAULT_DEBOUNCE_MS;
use crate::guard::{DEFAULT_COOLDOWN_MS, ReagentLabels};
use crate::samples::DEFAULT_RETENTION_DAYS;
use crate::series::SeriesParams;
use crate::util::days_to_ms;

/// Default store user/session identifier.
pub const DEFAULT_USER: &str = "local";
/// Time allowed for one probe read.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorCfg {
    /// Samples and dose events at or before `now - retention_ms` are evicted.
    pub retention_ms: i64,
    pub cooldown_ms: u64,
    pub labels: ReagentLabels,
    pub series: SeriesParams,
    /// Initial chart zoom factor, `[0.5, 4.0]`.
    pub zoom: f64,
    pub debounce_ms: u64,
    pub probe_timeout_ms: u64,
    /// Key for `users/<user>/...` store paths.
    pub user: String,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        Self {
            retention_ms: days_to_ms(DEFAULT_RETENTION_DAYS),
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            labels: ReagentLabels::default(),
            series: SeriesParams::default(),
            zoom: 1.0,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            user: DEFAULT_USER.into(),
        }
    }
}
