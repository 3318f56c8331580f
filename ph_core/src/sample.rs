//! Stored records: pH samples and dose events.
//!
//! Both are immutable once built and only constructible through validating
//! constructors. Their serde form matches the records persisted under
//! `users/<id>/phReadings` and `users/<id>/pumpLogs`.

use serde::{Deserialize, Serialize};

use crate::error::PhError;

/// Lowest and highest representable pH.
pub const PH_MIN: f64 = 0.0;
pub const PH_MAX: f64 = 14.0;

/// One timestamped pH measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SampleRecord", into = "SampleRecord")]
pub struct Sample {
    timestamp_ms: i64,
    value: f64,
}

#[derive(Serialize, Deserialize)]
struct SampleRecord {
    timestamp: i64,
    value: f64,
}

impl Sample {
    /// Build a sample; fails with `InvalidInput` unless `value` is a finite
    /// number in `[0, 14]`.
    pub fn new(timestamp_ms: i64, value: f64) -> Result<Self, PhError> {
        if !value.is_finite() {
            return Err(PhError::InvalidInput(format!(
                "pH value must be finite, got {value}"
            )));
        }
        if !(PH_MIN..=PH_MAX).contains(&value) {
            return Err(PhError::InvalidInput(format!(
                "pH value {value} outside [0, 14]"
            )));
        }
        Ok(Self {
            timestamp_ms,
            value,
        })
    }

    #[inline]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl TryFrom<SampleRecord> for Sample {
    type Error = PhError;
    fn try_from(r: SampleRecord) -> Result<Self, Self::Error> {
        Self::new(r.timestamp, r.value)
    }
}

impl From<Sample> for SampleRecord {
    fn from(s: Sample) -> Self {
        Self {
            timestamp: s.timestamp_ms,
            value: s.value,
        }
    }
}

/// Which pump a dose used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoseKind {
    /// Acid reagent; lowers pH.
    Acidic,
    /// Base reagent; raises pH.
    Basic,
}

impl DoseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseKind::Acidic => "acidic",
            DoseKind::Basic => "basic",
        }
    }
}

impl core::fmt::Display for DoseKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logged corrective reagent application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DoseRecord", into = "DoseRecord")]
pub struct DoseEvent {
    timestamp_ms: i64,
    kind: DoseKind,
    concentration: String,
    reagent: String,
}

#[derive(Serialize, Deserialize)]
struct DoseRecord {
    timestamp: i64,
    #[serde(rename = "type")]
    kind: DoseKind,
    concentration: String,
    #[serde(rename = "solution")]
    reagent: String,
}

impl DoseEvent {
    /// Build a dose event; both labels must be non-blank.
    pub fn new(
        timestamp_ms: i64,
        kind: DoseKind,
        concentration: impl Into<String>,
        reagent: impl Into<String>,
    ) -> Result<Self, PhError> {
        let concentration = concentration.into();
        let reagent = reagent.into();
        if concentration.trim().is_empty() {
            return Err(PhError::InvalidInput(
                "dose concentration label must not be empty".into(),
            ));
        }
        if reagent.trim().is_empty() {
            return Err(PhError::InvalidInput(
                "dose reagent label must not be empty".into(),
            ));
        }
        Ok(Self {
            timestamp_ms,
            kind,
            concentration,
            reagent,
        })
    }

    #[inline]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    #[inline]
    pub fn kind(&self) -> DoseKind {
        self.kind
    }

    pub fn concentration(&self) -> &str {
        &self.concentration
    }

    pub fn reagent(&self) -> &str {
        &self.reagent
    }
}

impl TryFrom<DoseRecord> for DoseEvent {
    type Error = PhError;
    fn try_from(r: DoseRecord) -> Result<Self, Self::Error> {
        Self::new(r.timestamp, r.kind, r.concentration, r.reagent)
    }
}

impl From<DoseEvent> for DoseRecord {
    fn from(e: DoseEvent) -> Self {
        Self {
            timestamp: e.timestamp_ms,
            kind: e.kind,
            concentration: e.concentration,
            reagent: e.reagent,
        }
    }
}
