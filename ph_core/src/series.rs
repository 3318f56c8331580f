//! Time-window renderer: a fixed-cadence, forward-filled series anchored to
//! "now".
//!
//! The lookback window grows with the data span up to `max_lookback_s`. Each
//! axis point takes the newest raw sample within half a step of it, or
//! carries the previous point's value forward. The final point always sits
//! at offset 0.

use serde::Serialize;

use crate::error::PhError;
use crate::sample::Sample;
use crate::util::{MILLIS_PER_SEC, ms_to_i64, secs_to_ms};

pub const DEFAULT_MAX_LOOKBACK_S: u64 = 86_400;
pub const DEFAULT_STEP_S: u64 = 5;
/// Raw gaps longer than this mark the window discontinuous.
pub const DEFAULT_GAP_MS: u64 = 120_000;
/// Window reported when there is nothing to draw; also the viewport floor.
pub const DEFAULT_MIN_WINDOW_S: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesParams {
    pub max_lookback_s: u64,
    pub step_s: u64,
    pub gap_ms: u64,
    pub min_window_s: u64,
}

impl Default for SeriesParams {
    fn default() -> Self {
        Self {
            max_lookback_s: DEFAULT_MAX_LOOKBACK_S,
            step_s: DEFAULT_STEP_S,
            gap_ms: DEFAULT_GAP_MS,
            min_window_s: DEFAULT_MIN_WINDOW_S,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Seconds relative to now; always `<= 0`.
    pub offset_s: i64,
    /// `None` until the first sample in the window has been seen.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
    pub window_s: u64,
    /// Some raw gap inside the window exceeded `gap_ms`.
    pub discontinuous: bool,
    /// Timestamp of the newest sample, for a "last reading at" label.
    pub last_reading_ms: Option<i64>,
}

impl Series {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at offset 0, if any.
    pub fn current(&self) -> Option<f64> {
        self.points.last().and_then(|p| p.value)
    }
}

/// Build the series for `samples` (ordered oldest first) as seen at `now_ms`.
///
/// Pure: identical inputs give identical output.
pub fn build_series(
    samples: &[Sample],
    now_ms: i64,
    params: &SeriesParams,
) -> Result<Series, PhError> {
    if params.step_s == 0 {
        return Err(PhError::InvalidInput("series step must be >= 1 s".into()));
    }
    if samples
        .windows(2)
        .any(|w| w[1].timestamp_ms() < w[0].timestamp_ms())
    {
        return Err(PhError::InvalidInput(
            "samples must be ordered by timestamp".into(),
        ));
    }

    let last_reading_ms = samples.last().map(Sample::timestamp_ms);
    let empty = Series {
        points: Vec::new(),
        window_s: params.min_window_s,
        discontinuous: false,
        last_reading_ms,
    };
    let Some(first) = samples.first() else {
        return Ok(empty);
    };

    let span_ms = u64::try_from(now_ms.saturating_sub(first.timestamp_ms())).unwrap_or(0);
    let window_s = span_ms
        .div_ceil(MILLIS_PER_SEC.unsigned_abs())
        .min(params.max_lookback_s);
    let start_ms = now_ms.saturating_sub(secs_to_ms(window_s));

    let lo = samples.partition_point(|s| s.timestamp_ms() < start_ms);
    let hi = samples.partition_point(|s| s.timestamp_ms() <= now_ms);
    let in_window = &samples[lo..hi.max(lo)];
    if in_window.is_empty() {
        return Ok(empty);
    }

    let gap_ms = ms_to_i64(params.gap_ms);
    let discontinuous = in_window
        .windows(2)
        .any(|w| w[1].timestamp_ms() - w[0].timestamp_ms() > gap_ms);

    let step = ms_to_i64(params.step_s);
    let half_ms = secs_to_ms(params.step_s) / 2;
    let window = ms_to_i64(window_s);

    let mut offsets: Vec<i64> = (0..)
        .map(|k: i64| -window + k * step)
        .take_while(|o| *o <= 0)
        .collect();
    if offsets.last() != Some(&0) {
        offsets.push(0);
    }

    let mut last_known: Option<f64> = None;
    let points = offsets
        .into_iter()
        .map(|offset_s| {
            let t = now_ms.saturating_add(offset_s.saturating_mul(MILLIS_PER_SEC));
            let lo = t.saturating_sub(half_ms);
            if let Some(v) = newest_within(in_window, lo, t.saturating_add(half_ms)) {
                last_known = Some(v);
            }
            SeriesPoint {
                offset_s,
                value: last_known,
            }
        })
        .collect();

    Ok(Series {
        points,
        window_s,
        discontinuous,
        last_reading_ms,
    })
}

/// Value of the newest sample with `lo <= ts <= hi`.
fn newest_within(samples: &[Sample], lo: i64, hi: i64) -> Option<f64> {
    let idx = samples.partition_point(|s| s.timestamp_ms() <= hi);
    let candidate = samples[..idx].last()?;
    (candidate.timestamp_ms() >= lo).then(|| candidate.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(ts: i64, v: f64) -> Sample {
        Sample::new(ts, v).expect("valid sample")
    }

    #[test]
    fn zero_step_is_invalid() {
        let p = SeriesParams {
            step_s: 0,
            ..SeriesParams::default()
        };
        assert!(build_series(&[], 0, &p).is_err());
    }

    #[test]
    fn unordered_samples_are_invalid() {
        let samples = [s(10_000, 7.0), s(5_000, 7.0)];
        assert!(build_series(&samples, 10_000, &SeriesParams::default()).is_err());
    }

    #[test]
    fn single_sample_at_now_yields_one_point() {
        let series =
            build_series(&[s(1_000, 6.8)], 1_000, &SeriesParams::default()).expect("series");
        assert_eq!(series.window_s, 0);
        assert_eq!(
            series.points,
            vec![SeriesPoint {
                offset_s: 0,
                value: Some(6.8)
            }]
        );
    }

    #[test]
    fn uneven_window_appends_zero_point() {
        // 12 s of data with a 5 s step: -12, -7, -2, then 0.
        let samples = [s(0, 7.0), s(12_000, 7.2)];
        let series = build_series(&samples, 12_000, &SeriesParams::default()).expect("series");
        let offsets: Vec<i64> = series.points.iter().map(|p| p.offset_s).collect();
        assert_eq!(offsets, vec![-12, -7, -2, 0]);
        assert_eq!(series.current(), Some(7.2));
    }

    #[test]
    fn timestamps_near_the_end_of_time_do_not_overflow() {
        let samples = [s(i64::MAX - 1_000, 7.0)];
        let series = build_series(&samples, i64::MAX, &SeriesParams::default()).expect("series");
        assert_eq!(series.window_s, 1);
        assert_eq!(series.current(), Some(7.0));
    }
}
