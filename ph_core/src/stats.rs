//! Aggregate statistics over retained samples and the dose log.

use serde::Serialize;

use crate::sample::{DoseEvent, DoseKind, Sample};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DoseCounts {
    pub acidic: usize,
    pub basic: usize,
}

impl DoseCounts {
    pub fn get(&self, kind: DoseKind) -> usize {
        match kind {
            DoseKind::Acidic => self.acidic,
            DoseKind::Basic => self.basic,
        }
    }

    pub fn total(&self) -> usize {
        self.acidic + self.basic
    }
}

/// Summary statistics. `average`, `min` and `max` are `None` when there are
/// no samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhStats {
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sample_count: usize,
    pub count_by_kind: DoseCounts,
}

/// Compute statistics over every sample passed in (the full retained set,
/// not the chart window) and tally doses by kind.
pub fn compute_stats(samples: &[Sample], doses: &[DoseEvent]) -> PhStats {
    let mut count_by_kind = DoseCounts::default();
    for d in doses {
        match d.kind() {
            DoseKind::Acidic => count_by_kind.acidic += 1,
            DoseKind::Basic => count_by_kind.basic += 1,
        }
    }

    if samples.is_empty() {
        return PhStats {
            count_by_kind,
            ..PhStats::default()
        };
    }

    let mut sum = 0.0_f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in samples {
        let v = s.value();
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    #[allow(clippy::cast_precision_loss)]
    let average = sum / samples.len() as f64;

    PhStats {
        average: Some(average),
        min: Some(min),
        max: Some(max),
        sample_count: samples.len(),
        count_by_kind,
    }
}
