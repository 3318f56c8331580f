#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    gaps_ms: Vec<u32>,
    values: Vec<u8>,
    tail_ms: u32,
    step_s: u8,
    gap_ms: u32,
    min_window_s: u16,
}

fuzz_target!(|input: Input| {
    let mut ts = 1_700_000_000_000_i64;
    let mut samples = Vec::new();
    for (gap, v) in input.gaps_ms.iter().zip(input.values.iter()) {
        ts += i64::from(*gap);
        if let Ok(s) = ph_core::Sample::new(ts, f64::from(*v) / 255.0 * 14.0) {
            samples.push(s);
        }
    }
    let params = ph_core::SeriesParams {
        max_lookback_s: 86_400,
        step_s: u64::from(input.step_s),
        gap_ms: u64::from(input.gap_ms),
        min_window_s: u64::from(input.min_window_s),
    };
    let now = ts + i64::from(input.tail_ms);
    if let Ok(series) = ph_core::build_series(&samples, now, &params) {
        if let Some(last) = series.points.last() {
            assert_eq!(last.offset_s, 0);
        }
        assert!(series.points.windows(2).all(|w| w[0].offset_s < w[1].offset_s));
    }
});
