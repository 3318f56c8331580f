use ph_core::{Sample, SeriesParams, Viewport, build_series};
use proptest::prelude::*;
use rstest::rstest;

fn s(ts: i64, v: f64) -> Sample {
    Sample::new(ts, v).expect("valid sample")
}

#[test]
fn window_follows_data_span_not_the_full_day() {
    let samples = [s(40_000, 7.0), s(100_000, 7.1)];
    let series = build_series(&samples, 100_000, &SeriesParams::default()).expect("series");
    assert_eq!(series.window_s, 60);
    assert_eq!(series.points.first().map(|p| p.offset_s), Some(-60));
    assert_eq!(series.points.last().map(|p| p.offset_s), Some(0));
    assert_eq!(series.points.len(), 13);
}

#[test]
fn window_is_capped_at_max_lookback() {
    let day_ms = 86_400_000;
    let samples = [s(0, 7.0), s(2 * day_ms, 7.2)];
    let series = build_series(&samples, 2 * day_ms, &SeriesParams::default()).expect("series");
    assert_eq!(series.window_s, 86_400);
    // the first sample is outside the window, so the line starts empty
    assert_eq!(series.points[0].value, None);
    assert_eq!(series.current(), Some(7.2));
}

#[test]
fn no_samples_in_window_yields_empty_series_with_floor() {
    let series = build_series(&[], 1_000, &SeriesParams::default()).expect("series");
    assert!(series.is_empty());
    assert_eq!(series.window_s, 300);
    assert!(!series.discontinuous);

    let future = [s(5_000, 7.0)];
    let series = build_series(&future, 1_000, &SeriesParams::default()).expect("series");
    assert!(series.is_empty());
    assert_eq!(series.window_s, 300);
}

#[rstest]
#[case(120_000, false)]
#[case(120_001, true)]
fn continuity_threshold(#[case] gap: i64, #[case] discontinuous: bool) {
    let samples = [s(0, 7.0), s(5_000, 7.0), s(5_000 + gap, 7.0)];
    let now = 5_000 + gap;
    let series = build_series(&samples, now, &SeriesParams::default()).expect("series");
    assert_eq!(series.discontinuous, discontinuous);
    assert_eq!(series.last_reading_ms, Some(now));
}

#[test]
fn gap_before_window_does_not_count() {
    let day_ms: i64 = 86_400_000;
    let now = 3 * day_ms;
    let samples = [s(0, 7.0), s(now - 10_000, 7.0), s(now, 7.0)];
    let series = build_series(&samples, now, &SeriesParams::default()).expect("series");
    assert!(!series.discontinuous);
}

#[test]
fn points_between_samples_are_forward_filled() {
    let samples = [s(0, 6.0), s(30_000, 8.0)];
    let series = build_series(&samples, 30_000, &SeriesParams::default()).expect("series");
    let values: Vec<Option<f64>> = series.points.iter().map(|p| p.value).collect();
    assert_eq!(
        values,
        vec![
            Some(6.0),
            Some(6.0),
            Some(6.0),
            Some(6.0),
            Some(6.0),
            Some(6.0),
            Some(8.0)
        ]
    );
}

#[test]
fn half_step_match_is_inclusive() {
    // sample 2.5 s after the -10 point belongs to it
    let samples = [s(0, 6.0), s(2_500, 6.5), s(10_000, 7.0)];
    let series = build_series(&samples, 10_000, &SeriesParams::default()).expect("series");
    assert_eq!(series.points[0].offset_s, -10);
    assert_eq!(series.points[0].value, Some(6.5));
}

#[test]
fn viewport_slices_without_rebuilding() {
    let samples: Vec<Sample> = (0..=720).map(|i| s(i * 5_000, 7.0)).collect();
    let now = 720 * 5_000;
    let series = build_series(&samples, now, &SeriesParams::default()).expect("series");
    assert_eq!(series.window_s, 3_600);
    let vp = Viewport::new(4.0, 300).expect("zoom");
    assert_eq!(vp.visible_seconds(series.window_s), 900);
    let visible = vp.visible_points(&series);
    assert_eq!(visible.first().map(|p| p.offset_s), Some(-900));
    assert_eq!(visible.last().map(|p| p.offset_s), Some(0));
}

prop_compose! {
    fn sample_set()(gaps in prop::collection::vec(1i64..200_000, 1..60),
                    values in prop::collection::vec(0.0f64..=14.0, 60),
                    tail in 0i64..50_000) -> (Vec<Sample>, i64) {
        let mut ts = 1_000_000i64;
        let mut out = Vec::with_capacity(gaps.len());
        for (i, g) in gaps.iter().enumerate() {
            ts += g;
            out.push(Sample::new(ts, values[i]).expect("in range"));
        }
        (out, ts + tail)
    }
}

proptest! {
    #[test]
    fn build_is_idempotent((samples, now) in sample_set()) {
        let p = SeriesParams::default();
        let a = build_series(&samples, now, &p).expect("series");
        let b = build_series(&samples, now, &p).expect("series");
        prop_assert_eq!(a, b);
    }

    #[test]
    fn unmatched_points_repeat_previous_point((samples, now) in sample_set()) {
        let p = SeriesParams::default();
        let series = build_series(&samples, now, &p).expect("series");
        let half = 2_500i64;
        let mut prev: Option<Option<f64>> = None;
        for pt in &series.points {
            let t = now + pt.offset_s * 1_000;
            let matched = samples
                .iter()
                .any(|s| s.timestamp_ms() >= t - half && s.timestamp_ms() <= t + half);
            if !matched {
                prop_assert_eq!(pt.value, prev.unwrap_or(None));
            }
            prev = Some(pt.value);
        }
    }

    #[test]
    fn last_point_is_now_with_latest_value((samples, now) in sample_set()) {
        let series = build_series(&samples, now, &SeriesParams::default()).expect("series");
        let last = series.points.last().expect("non-empty window");
        prop_assert_eq!(last.offset_s, 0);
        let latest = samples.last().map(Sample::value);
        prop_assert_eq!(last.value, latest);
        prop_assert!(series.points.iter().all(|p| p.offset_s <= 0));
    }
}
