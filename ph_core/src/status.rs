//! Outcome of one ingestion cycle.

use serde::Serialize;

use crate::sample::{DoseEvent, Sample};
use crate::threshold::Classification;

/// A sample that made it into the store, with the decision taken on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub sample: Sample,
    pub classification: Classification,
    /// The dose recorded for this sample, if one was.
    pub dose: Option<DoseEvent>,
    /// A pump action was wanted but the cooldown held it back.
    pub dose_suppressed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Sample stored and evaluated.
    Recorded(Reading),
    /// Another cycle was still in flight; this tick was discarded.
    Dropped,
    /// The monitor has been stopped.
    Stopped,
}

impl TickOutcome {
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            TickOutcome::Recorded(r) => Some(r),
            _ => None,
        }
    }
}
