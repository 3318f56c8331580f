//! Conversions from `ph_config` file types to `ph_core` runtime types.
//!
//! Config structs are validated by `ph_config::Config::validate`; the
//! fallible conversions here re-check the invariants the core relies on.

use crate::config::MonitorCfg;
use crate::crop::Crop;
use crate::error::PhError;
use crate::guard::ReagentLabels;
use crate::series::SeriesParams;
use crate::sim::SimParams;
use crate::threshold::TargetRange;
use crate::util::days_to_ms;
use crate::viewport::{MAX_ZOOM, MIN_ZOOM};

// ── Reagent labels ───────────────────────────────────────────────────────────

impl From<&ph_config::GuardCfg> for ReagentLabels {
    fn from(c: &ph_config::GuardCfg) -> Self {
        Self {
            acid: c.acid_reagent.clone(),
            base: c.base_reagent.clone(),
            concentration: c.concentration.clone(),
        }
    }
}

// ── Series ───────────────────────────────────────────────────────────────────

impl From<&ph_config::ChartCfg> for SeriesParams {
    fn from(c: &ph_config::ChartCfg) -> Self {
        Self {
            max_lookback_s: c.max_lookback_s,
            step_s: c.step_s,
            gap_ms: c.gap_ms,
            min_window_s: c.min_window_s,
        }
    }
}

// ── Simulator ────────────────────────────────────────────────────────────────

impl From<&ph_config::SimulatorCfg> for SimParams {
    fn from(c: &ph_config::SimulatorCfg) -> Self {
        Self {
            start_ph: c.start_ph,
            max_step: c.max_step,
            min_ph: c.min_ph,
            max_ph: c.max_ph,
            seed: c.seed,
        }
    }
}

// ── Targets ──────────────────────────────────────────────────────────────────

impl TryFrom<&ph_config::TargetCfg> for TargetRange {
    type Error = PhError;
    fn try_from(c: &ph_config::TargetCfg) -> Result<Self, Self::Error> {
        TargetRange::new(c.min_ph, c.max_ph)
    }
}

impl TryFrom<&ph_config::CropEntry> for Crop {
    type Error = PhError;
    fn try_from(c: &ph_config::CropEntry) -> Result<Self, Self::Error> {
        Crop::new(c.name.clone(), c.min_ph, c.max_ph)
    }
}

// ── Monitor ──────────────────────────────────────────────────────────────────

impl TryFrom<&ph_config::Config> for MonitorCfg {
    type Error = PhError;
    fn try_from(c: &ph_config::Config) -> Result<Self, Self::Error> {
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&c.chart.zoom) {
            return Err(PhError::Config(format!(
                "chart.zoom {} outside [{MIN_ZOOM}, {MAX_ZOOM}]",
                c.chart.zoom
            )));
        }
        if c.chart.step_s == 0 {
            return Err(PhError::Config("chart.step_s must be >= 1".into()));
        }
        Ok(Self {
            retention_ms: days_to_ms(c.retention.days),
            cooldown_ms: c.guard.cooldown_ms,
            labels: ReagentLabels::from(&c.guard),
            series: SeriesParams::from(&c.chart),
            zoom: c.chart.zoom,
            debounce_ms: c.ticker.debounce_ms,
            user: c.store.user.clone(),
            ..MonitorCfg::default()
        })
    }
}
