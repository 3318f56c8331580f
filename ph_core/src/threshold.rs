//! Threshold controller: classify a pH reading against the active target
//! range and decide which pump, if any, should run.

use serde::Serialize;

use crate::error::PhError;
use crate::sample::{DoseKind, PH_MAX, PH_MIN};

/// Default lower bound when no crop is selected.
pub const DEFAULT_MIN_PH: f64 = 6.5;
/// Default upper bound when no crop is selected.
pub const DEFAULT_MAX_PH: f64 = 7.5;

/// Inclusive acceptable pH band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetRange {
    min: f64,
    max: f64,
}

impl TargetRange {
    /// Build a range; requires finite bounds with `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self, PhError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(PhError::InvalidInput(
                "target range bounds must be finite".into(),
            ));
        }
        if min >= max {
            return Err(PhError::InvalidInput(format!(
                "target range min ({min}) must be < max ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    #[inline]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// True when `value` lies inside the band, bounds included.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for TargetRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_PH,
            max: DEFAULT_MAX_PH,
        }
    }
}

impl core::fmt::Display for TargetRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.1}-{:.1}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhStatus {
    TooAcidic,
    TooBasic,
    Optimal,
}

impl PhStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PhStatus::TooAcidic => "Too Acidic",
            PhStatus::TooBasic => "Too Basic",
            PhStatus::Optimal => "Optimal",
        }
    }
}

impl core::fmt::Display for PhStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Pump that should run to bring the soil back into range.
///
/// `Basic` raises pH (soil too acidic); `Acidic` lowers it (soil too basic).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpAction {
    Acidic,
    Basic,
    None,
}

impl PumpAction {
    /// Dose kind this action produces, if any.
    pub fn dose_kind(&self) -> Option<DoseKind> {
        match self {
            PumpAction::Acidic => Some(DoseKind::Acidic),
            PumpAction::Basic => Some(DoseKind::Basic),
            PumpAction::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: PhStatus,
    pub action: PumpAction,
}

/// Classify `value` against `range`.
///
/// Both bounds count as optimal. Non-finite values are rejected.
pub fn classify(value: f64, range: &TargetRange) -> Result<Classification, PhError> {
    if !value.is_finite() {
        return Err(PhError::InvalidInput(format!(
            "cannot classify non-finite pH {value}"
        )));
    }
    let c = if value < range.min {
        Classification {
            status: PhStatus::TooAcidic,
            action: PumpAction::Basic,
        }
    } else if value > range.max {
        Classification {
            status: PhStatus::TooBasic,
            action: PumpAction::Acidic,
        }
    } else {
        Classification {
            status: PhStatus::Optimal,
            action: PumpAction::None,
        }
    };
    Ok(c)
}

/// Position of `ph` on the 0-14 scale as a percentage, clamped to `[0, 100]`.
pub fn scale_position(ph: f64) -> f64 {
    if !ph.is_finite() {
        return 0.0;
    }
    (ph.clamp(PH_MIN, PH_MAX) / PH_MAX) * 100.0
}
