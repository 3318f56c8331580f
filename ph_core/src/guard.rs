//! Dosing guard: turns pump actions into logged dose events, at most one
//! per cooldown period.

use crate::error::PhError;
use crate::persist::RecordLog;
use crate::sample::{DoseEvent, DoseKind};
use crate::samples::DEFAULT_RETENTION_DAYS;
use crate::threshold::PumpAction;
use crate::util::days_to_ms;

/// Default minimum spacing between doses.
pub const DEFAULT_COOLDOWN_MS: u64 = 10_000;

pub const DEFAULT_ACID_REAGENT: &str = "Acetic Acid (CH3COOH)";
pub const DEFAULT_BASE_REAGENT: &str = "Ammonium Hydroxide (NH4OH)";
pub const DEFAULT_CONCENTRATION: &str = "1%";

/// Labels recorded on each dose event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReagentLabels {
    pub acid: String,
    pub base: String,
    pub concentration: String,
}

impl Default for ReagentLabels {
    fn default() -> Self {
        Self {
            acid: DEFAULT_ACID_REAGENT.into(),
            base: DEFAULT_BASE_REAGENT.into(),
            concentration: DEFAULT_CONCENTRATION.into(),
        }
    }
}

impl ReagentLabels {
    pub fn reagent_for(&self, kind: DoseKind) -> &str {
        match kind {
            DoseKind::Acidic => &self.acid,
            DoseKind::Basic => &self.base,
        }
    }
}

/// Cooldown-gated dose log.
///
/// The cooldown is flat: after any dose, every further action is suppressed
/// until `cooldown_ms` has elapsed, regardless of pump direction.
#[derive(Debug)]
pub struct DosingGuard {
    cooldown_ms: u64,
    retention_ms: i64,
    events: Vec<DoseEvent>,
    last_dose_ms: Option<i64>,
    log: Option<RecordLog>,
}

impl Default for DosingGuard {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}

impl DosingGuard {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown_ms,
            retention_ms: days_to_ms(DEFAULT_RETENTION_DAYS),
            events: Vec::new(),
            last_dose_ms: None,
            log: None,
        }
    }

    pub fn with_log(mut self, log: RecordLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Dose events share the sample retention window.
    pub fn with_retention(mut self, retention_ms: i64) -> Self {
        self.retention_ms = retention_ms.max(1);
        self
    }

    pub fn cooldown_ms(&self) -> u64 {
        self.cooldown_ms
    }

    /// True if a dose at `now_ms` would be inside the cooldown.
    pub fn in_cooldown(&self, now_ms: i64) -> bool {
        self.last_dose_ms.is_some_and(|last| {
            let elapsed = now_ms.saturating_sub(last);
            elapsed < crate::util::ms_to_i64(self.cooldown_ms)
        })
    }

    /// Record a dose for `action` unless it is `None` or inside the cooldown.
    ///
    /// Returns the new event when one was recorded. If persisting fails the
    /// cooldown state is left untouched.
    pub fn maybe_dose(
        &mut self,
        now_ms: i64,
        action: PumpAction,
        labels: &ReagentLabels,
    ) -> Result<Option<DoseEvent>, PhError> {
        let Some(kind) = action.dose_kind() else {
            return Ok(None);
        };
        if self.in_cooldown(now_ms) {
            tracing::debug!(kind = %kind, now_ms, "dose suppressed by cooldown");
            return Ok(None);
        }
        let event = DoseEvent::new(
            now_ms,
            kind,
            labels.concentration.clone(),
            labels.reagent_for(kind),
        )?;
        if let Some(log) = &self.log {
            log.append(&event)?;
        }
        tracing::info!(kind = %kind, reagent = event.reagent(), now_ms, "dose recorded");
        self.last_dose_ms = Some(now_ms);
        self.events.push(event.clone());
        self.evict(now_ms);
        Ok(Some(event))
    }

    /// Drop events with `timestamp <= now - retention`. The cooldown pointer
    /// is kept even when its event expires.
    pub fn evict(&mut self, now_ms: i64) -> usize {
        let cutoff = now_ms.saturating_sub(self.retention_ms);
        let keep_from = self
            .events
            .partition_point(|e| e.timestamp_ms() <= cutoff);
        self.events.drain(..keep_from);
        keep_from
    }

    /// All dose events, oldest first.
    pub fn events(&self) -> &[DoseEvent] {
        &self.events
    }

    pub fn last_dose(&self) -> Option<&DoseEvent> {
        self.events.last()
    }

    /// Up to `n` most recent events, newest first.
    pub fn recent(&self, n: usize) -> Vec<DoseEvent> {
        self.events.iter().rev().take(n).cloned().collect()
    }

    /// Replace the log with previously stored events. The cooldown resumes
    /// from the newest one.
    pub fn restore(&mut self, mut events: Vec<DoseEvent>, now_ms: i64) {
        events.sort_by_key(DoseEvent::timestamp_ms);
        self.last_dose_ms = events.last().map(DoseEvent::timestamp_ms);
        self.events = events;
        self.evict(now_ms);
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.last_dose_ms = None;
    }
}
