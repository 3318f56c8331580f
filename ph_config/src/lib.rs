#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and crop catalog parsing for the pH monitor.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; an empty file yields the stock dashboard
//!   behaviour (6.5–7.5 target, 10 s dose cooldown, 30 day retention).
//! - The crop catalog CSV loader enforces headers and rejects duplicate
//!   names or inverted pH bands.
use serde::Deserialize;
use std::collections::HashSet;

/// Lowest and highest representable pH.
pub const PH_SCALE_MIN: f64 = 0.0;
pub const PH_SCALE_MAX: f64 = 14.0;

/// Crop catalog CSV schema.
///
/// Expected headers:
/// crop,min_ph,max_ph
///
/// Example:
/// crop,min_ph,max_ph
/// rice,5.5,6.5
/// wheat,6.0,7.5
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CropRow {
    pub crop: String,
    pub min_ph: f64,
    pub max_ph: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TargetCfg {
    /// Name of the crop the band belongs to (informational).
    pub crop: String,
    pub min_ph: f64,
    pub max_ph: f64,
}

impl Default for TargetCfg {
    fn default() -> Self {
        Self {
            crop: "default".to_string(),
            min_ph: 6.5,
            max_ph: 7.5,
        }
    }
}

/// Inline crop catalog entry (`[[crops]]`).
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CropEntry {
    pub name: String,
    pub min_ph: f64,
    pub max_ph: f64,
}

impl From<CropRow> for CropEntry {
    fn from(r: CropRow) -> Self {
        Self {
            name: r.crop,
            min_ph: r.min_ph,
            max_ph: r.max_ph,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GuardCfg {
    /// Minimum time between two accepted doses (ms).
    pub cooldown_ms: u64,
    /// Concentration label stamped on every dose, e.g. "1%".
    pub concentration: String,
    /// Reagent used when pH is too high.
    pub acid_reagent: String,
    /// Reagent used when pH is too low.
    pub base_reagent: String,
}

impl Default for GuardCfg {
    fn default() -> Self {
        Self {
            cooldown_ms: 10_000,
            concentration: "1%".to_string(),
            acid_reagent: "Acetic Acid (CH3COOH)".to_string(),
            base_reagent: "Ammonium Hydroxide (NH4OH)".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetentionCfg {
    /// Samples and doses older than this many days are evicted.
    pub days: u32,
}

impl Default for RetentionCfg {
    fn default() -> Self {
        Self { days: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartCfg {
    /// Upper bound on the chart lookback (seconds).
    pub max_lookback_s: u64,
    /// Axis cadence (seconds).
    pub step_s: u64,
    /// Raw inter-sample gap above which the data is flagged discontinuous (ms).
    pub gap_ms: u64,
    /// Floor for the window and the zoomed viewport (seconds).
    pub min_window_s: u64,
    /// Initial zoom factor, in [0.5, 4.0].
    pub zoom: f64,
}

impl Default for ChartCfg {
    fn default() -> Self {
        Self {
            max_lookback_s: 86_400,
            step_s: 5,
            gap_ms: 120_000,
            min_window_s: 300,
            zoom: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TickerCfg {
    /// Ingestion cadence (ms).
    pub interval_ms: u64,
    /// Chart re-render debounce (ms).
    pub debounce_ms: u64,
}

impl Default for TickerCfg {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            debounce_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreCfg {
    /// Directory holding the JSON-lines store files.
    pub dir: String,
    /// User/session identifier that scopes every stored path.
    pub user: String,
}

impl Default for StoreCfg {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            user: "local".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorCfg {
    pub start_ph: f64,
    /// Largest change per reading, in either direction.
    pub max_step: f64,
    pub min_ph: f64,
    pub max_ph: f64,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            start_ph: 7.0,
            max_step: 0.15,
            min_ph: 4.0,
            max_ph: 10.0,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub target: TargetCfg,
    pub crops: Vec<CropEntry>,
    pub guard: GuardCfg,
    pub retention: RetentionCfg,
    pub chart: ChartCfg,
    pub ticker: TickerCfg,
    pub store: StoreCfg,
    pub simulator: SimulatorCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Check a pH band: both ends finite, inside the pH scale, and `min < max`.
pub fn check_band(what: &str, min_ph: f64, max_ph: f64) -> eyre::Result<()> {
    if !min_ph.is_finite() || !max_ph.is_finite() {
        eyre::bail!("{what}: pH bounds must be finite");
    }
    if !(PH_SCALE_MIN..=PH_SCALE_MAX).contains(&min_ph)
        || !(PH_SCALE_MIN..=PH_SCALE_MAX).contains(&max_ph)
    {
        eyre::bail!("{what}: pH bounds must be within [0, 14]");
    }
    if min_ph >= max_ph {
        eyre::bail!("{what}: min_ph must be < max_ph (got {min_ph} >= {max_ph})");
    }
    Ok(())
}

/// Validate a crop list: non-empty names, unique (case-insensitive), valid bands.
pub fn validate_crops(crops: &[CropEntry]) -> eyre::Result<()> {
    let mut seen = HashSet::new();
    for c in crops {
        let name = c.name.trim();
        if name.is_empty() {
            eyre::bail!("crop name must not be empty");
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            eyre::bail!("duplicate crop '{name}'");
        }
        check_band(&format!("crop '{name}'"), c.min_ph, c.max_ph)?;
    }
    Ok(())
}

pub fn load_crops_csv(path: &std::path::Path) -> eyre::Result<Vec<CropEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open crop CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["crop", "min_ph", "max_ph"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "crop CSV must have headers 'crop,min_ph,max_ph', got: {}",
            actual.join(",")
        );
    }

    let mut crops = Vec::new();
    for (idx, rec) in rdr.deserialize::<CropRow>().enumerate() {
        match rec {
            Ok(row) => crops.push(CropEntry::from(row)),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    validate_crops(&crops)?;
    Ok(crops)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Target
        check_band("target", self.target.min_ph, self.target.max_ph)?;

        // Crops
        validate_crops(&self.crops)?;

        // Guard
        if self.guard.cooldown_ms == 0 {
            eyre::bail!("guard.cooldown_ms must be >= 1");
        }
        if self.guard.cooldown_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("guard.cooldown_ms is unreasonably large (>24h)");
        }
        if self.guard.acid_reagent.trim().is_empty() || self.guard.base_reagent.trim().is_empty() {
            eyre::bail!("guard reagent labels must not be empty");
        }
        if self.guard.concentration.trim().is_empty() {
            eyre::bail!("guard.concentration must not be empty");
        }

        // Retention
        if self.retention.days == 0 {
            eyre::bail!("retention.days must be >= 1");
        }
        if self.retention.days > 3650 {
            eyre::bail!("retention.days is unreasonably large (>10y)");
        }

        // Chart
        if self.chart.step_s == 0 {
            eyre::bail!("chart.step_s must be >= 1");
        }
        if self.chart.max_lookback_s < self.chart.step_s {
            eyre::bail!("chart.max_lookback_s must be >= chart.step_s");
        }
        if self.chart.gap_ms == 0 {
            eyre::bail!("chart.gap_ms must be >= 1");
        }
        if self.chart.min_window_s == 0 {
            eyre::bail!("chart.min_window_s must be >= 1");
        }
        if !(0.5..=4.0).contains(&self.chart.zoom) {
            eyre::bail!("chart.zoom must be in [0.5, 4.0]");
        }

        // Ticker
        if self.ticker.interval_ms == 0 {
            eyre::bail!("ticker.interval_ms must be >= 1");
        }

        // Store
        if self.store.user.trim().is_empty() {
            eyre::bail!("store.user must not be empty");
        }
        if self.store.user.contains('/') {
            eyre::bail!("store.user must not contain '/'");
        }

        // Simulator
        check_band("simulator", self.simulator.min_ph, self.simulator.max_ph)?;
        if !(self.simulator.min_ph..=self.simulator.max_ph).contains(&self.simulator.start_ph) {
            eyre::bail!("simulator.start_ph must lie within [simulator.min_ph, simulator.max_ph]");
        }
        if !self.simulator.max_step.is_finite() || self.simulator.max_step < 0.0 {
            eyre::bail!("simulator.max_step must be >= 0");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref() {
            if !matches!(r, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never, daily, hourly");
            }
        }

        Ok(())
    }
}
