//! `PhMonitor`: the session context tying the components together.
//!
//! One ingestion cycle (read, store, classify, dose) holds the probe lock
//! from start to finish. `tick` takes it with `try_lock`, so a tick that
//! lands while another cycle is in flight is dropped rather than queued.
//! The state lock is separate and only held for the commit step and by
//! readers (stats, series, snapshot), which wait for it instead of dropping
//! ticks.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::Duration;

use crossbeam_channel as xch;
use ph_traits::{Clock, PhProbe, Subscription};
use serde::Serialize;

use crate::builder::MonitorBuilder;
use crate::config::MonitorCfg;
use crate::crop::TargetProvider;
use crate::debounce::Debouncer;
use crate::error::{PhError, Result};
use crate::guard::DosingGuard;
use crate::persist::RecordLog;
use crate::sample::{DoseEvent, Sample};
use crate::samples::SampleStore;
use crate::series::{Series, SeriesPoint, build_series};
use crate::stats::{PhStats, compute_stats};
use crate::status::{Reading, TickOutcome};
use crate::threshold::{Classification, PumpAction, TargetRange, classify};
use crate::timefmt::TimeRange;
use crate::viewport::Viewport;

/// Number of entries shown in the recent-activity list.
pub const DEFAULT_RECENT: usize = 10;

pub(crate) struct State {
    pub(crate) samples: SampleStore,
    pub(crate) guard: DosingGuard,
    pub(crate) debouncer: Debouncer,
    pub(crate) viewport: Viewport,
    pub(crate) followed: Option<xch::Receiver<Sample>>,
}

/// A series ready to draw plus the viewport to draw it with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub generated_at_ms: i64,
    pub series: Series,
    pub viewport: Viewport,
    pub visible_s: u64,
}

impl RenderFrame {
    pub fn visible_points(&self) -> &[SeriesPoint] {
        self.viewport.visible_points(&self.series)
    }
}

/// Point-in-time view of the monitor for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub now_ms: i64,
    pub latest: Option<Sample>,
    pub classification: Option<Classification>,
    pub range: TargetRange,
    pub scale_position: Option<f64>,
    pub last_dose: Option<DoseEvent>,
    pub in_cooldown: bool,
    pub sample_count: usize,
    pub dose_count: usize,
}

/// Counts restored by [`PhMonitor::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub samples: usize,
    pub doses: usize,
}

pub struct PhMonitor {
    pub(crate) cfg: MonitorCfg,
    pub(crate) clock: Box<dyn Clock + Send + Sync>,
    pub(crate) targets: Arc<dyn TargetProvider + Send + Sync>,
    /// Held for a whole ingestion cycle.
    pub(crate) probe: Mutex<Box<dyn PhProbe + Send>>,
    pub(crate) readings: Option<RecordLog>,
    pub(crate) doses: Option<RecordLog>,
    pub(crate) state: Mutex<State>,
    pub(crate) subscriptions: Mutex<Vec<Subscription>>,
    pub(crate) stopped: AtomicBool,
    pub(crate) dropped_ticks: AtomicU64,
}

impl core::fmt::Debug for PhMonitor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PhMonitor")
            .field("user", &self.cfg.user)
            .field("range", &self.targets.current())
            .field("stopped", &self.is_stopped())
            .field("dropped_ticks", &self.dropped_ticks())
            .finish_non_exhaustive()
    }
}

impl PhMonitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::default()
    }

    pub fn config(&self) -> &MonitorCfg {
        &self.cfg
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn target_range(&self) -> TargetRange {
        self.targets.current()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Ticks discarded because a cycle was already running.
    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks.load(Ordering::Relaxed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| eyre::Report::new(PhError::State("monitor state lock poisoned".into())))
    }

    /// Single-flight gate; `None` when another cycle holds it.
    fn begin_cycle(&self) -> Result<Option<MutexGuard<'_, Box<dyn PhProbe + Send>>>> {
        match self.probe.try_lock() {
            Ok(g) => Ok(Some(g)),
            Err(TryLockError::WouldBlock) => {
                self.dropped_ticks.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("tick dropped: ingestion cycle in flight");
                Ok(None)
            }
            Err(TryLockError::Poisoned(_)) => Err(eyre::Report::new(PhError::State(
                "probe lock poisoned".into(),
            ))),
        }
    }

    /// Run one cycle at the clock's current time.
    pub fn tick(&self) -> Result<TickOutcome> {
        self.tick_at(self.clock.now_ms())
    }

    /// Run one cycle: read the probe, store the sample taken at `now_ms`,
    /// classify it and let the guard decide on a dose.
    pub fn tick_at(&self, now_ms: i64) -> Result<TickOutcome> {
        if self.is_stopped() {
            return Ok(TickOutcome::Stopped);
        }
        let Some(mut probe) = self.begin_cycle()? else {
            return Ok(TickOutcome::Dropped);
        };
        let timeout = Duration::from_millis(self.cfg.probe_timeout_ms);
        let value = probe
            .read(timeout)
            .map_err(|e| PhError::Sensor(e.to_string()))?;
        let sample = Sample::new(now_ms, value)?;
        let mut st = self.lock()?;
        self.drain_followed(&mut st, now_ms);
        let reading = self.cycle(&mut st, sample, now_ms)?;
        Ok(TickOutcome::Recorded(reading))
    }

    /// Run one cycle on a sample supplied by the caller (an external sensor
    /// feed) instead of reading the probe.
    pub fn ingest(&self, sample: Sample) -> Result<TickOutcome> {
        if self.is_stopped() {
            return Ok(TickOutcome::Stopped);
        }
        let Some(_cycle) = self.begin_cycle()? else {
            return Ok(TickOutcome::Dropped);
        };
        let now_ms = self.clock.now_ms().max(sample.timestamp_ms());
        let mut st = self.lock()?;
        self.drain_followed(&mut st, now_ms);
        let reading = self.cycle(&mut st, sample, now_ms)?;
        Ok(TickOutcome::Recorded(reading))
    }

    fn cycle(&self, st: &mut State, sample: Sample, now_ms: i64) -> Result<Reading> {
        if let Err(e) = st.samples.ingest(sample, now_ms) {
            match &e {
                PhError::ClockSkew { .. } | PhError::InvalidInput(_) => {
                    tracing::warn!(error = %e, "sample rejected");
                }
                _ => tracing::warn!(error = %e, "sample not stored"),
            }
            return Err(e.into());
        }
        tracing::trace!(ts = sample.timestamp_ms(), ph = sample.value(), "sample stored");

        let range = self.targets.current();
        let classification = classify(sample.value(), &range)?;
        let dose = st
            .guard
            .maybe_dose(sample.timestamp_ms(), classification.action, &self.cfg.labels)
            .inspect_err(|e| tracing::warn!(error = %e, "dose not recorded"))?;
        st.guard.evict(now_ms);
        let dose_suppressed = classification.action != PumpAction::None && dose.is_none();
        st.debouncer.request(now_ms);

        Ok(Reading {
            sample,
            classification,
            dose,
            dose_suppressed,
        })
    }

    fn drain_followed(&self, st: &mut State, now_ms: i64) {
        let Some(rx) = st.followed.clone() else {
            return;
        };
        let mut took = 0usize;
        for sample in rx.try_iter() {
            let newer = st
                .samples
                .latest()
                .is_none_or(|l| sample.timestamp_ms() > l.timestamp_ms());
            if newer && st.samples.ingest_replicated(sample, now_ms).is_ok() {
                took += 1;
            }
        }
        if took > 0 {
            tracing::trace!(took, "merged followed samples");
            st.debouncer.request(now_ms);
        }
    }

    /// Subscribe to the readings path so samples appended by other writers
    /// sharing the same store handle show up in this monitor. They are merged
    /// at the start of the next cycle and are never re-persisted or dosed on.
    /// Store notifications do not cross process boundaries.
    pub fn follow(&self) -> Result<()> {
        let Some(log) = &self.readings else {
            return Err(eyre::Report::new(PhError::State(
                "follow requires a store".into(),
            )));
        };
        let (tx, rx) = xch::unbounded::<Sample>();
        let sub = log.subscribe(Box::new(move |record: &str| {
            if let Ok(sample) = serde_json::from_str::<Sample>(record) {
                let _ = tx.send(sample);
            }
        }))?;
        self.lock()?.followed = Some(rx);
        self.subscriptions
            .lock()
            .map_err(|_| eyre::Report::new(PhError::State("subscription lock poisoned".into())))?
            .push(sub);
        tracing::debug!(path = log.path(), "following readings");
        Ok(())
    }

    /// Rebuild samples and doses from the store. Malformed or expired
    /// records are skipped; the newest dose restores the cooldown.
    pub fn load(&self) -> Result<LoadSummary> {
        let now_ms = self.clock.now_ms();
        let samples: Vec<Sample> = match &self.readings {
            Some(log) => log.load()?,
            None => Vec::new(),
        };
        let doses: Vec<DoseEvent> = match &self.doses {
            Some(log) => log.load()?,
            None => Vec::new(),
        };
        let mut st = self.lock()?;
        st.samples.restore(samples, now_ms);
        st.guard.restore(doses, now_ms);
        st.debouncer.request(now_ms);
        let summary = LoadSummary {
            samples: st.samples.len(),
            doses: st.guard.events().len(),
        };
        tracing::info!(samples = summary.samples, doses = summary.doses, "state loaded");
        Ok(summary)
    }

    /// Wipe samples, doses and the cooldown pointer, in the store first and
    /// then in memory.
    pub fn clear(&self) -> Result<()> {
        let mut st = self.lock()?;
        if let Some(log) = &self.readings {
            log.clear()?;
        }
        st.samples.clear();
        if let Some(log) = &self.doses {
            log.clear()?;
        }
        st.guard.clear();
        // Echoes of our own appends are still queued; they predate the wipe.
        if let Some(rx) = &st.followed {
            let stale = rx.try_iter().count();
            if stale > 0 {
                tracing::debug!(stale, "discarded followed samples from before clear");
            }
        }
        st.debouncer.request(self.clock.now_ms());
        tracing::info!("all data cleared");
        Ok(())
    }

    /// Stop ticking and release every store subscription. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let subs = match self.subscriptions.lock() {
            Ok(mut s) => std::mem::take(&mut *s),
            Err(_) => Vec::new(),
        };
        let released = subs.len();
        for sub in subs {
            sub.unsubscribe();
        }
        if let Ok(mut st) = self.state.lock() {
            st.debouncer.cancel();
            st.followed = None;
        }
        tracing::info!(released, "monitor stopped");
    }

    /// Number of live store subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn stats(&self) -> Result<PhStats> {
        let st = self.lock()?;
        Ok(compute_stats(st.samples.samples(), st.guard.events()))
    }

    pub fn series(&self) -> Result<Series> {
        let now_ms = self.clock.now_ms();
        let st = self.lock()?;
        Ok(build_series(st.samples.samples(), now_ms, &self.cfg.series)?)
    }

    /// Build a frame if the debounced render is due.
    pub fn poll_render(&self) -> Result<Option<RenderFrame>> {
        let now_ms = self.clock.now_ms();
        let mut st = self.lock()?;
        if !st.debouncer.fire_if_due(now_ms) {
            return Ok(None);
        }
        Ok(Some(self.frame(&st, now_ms)?))
    }

    /// Build a frame now, cancelling any pending debounced render.
    pub fn render_now(&self) -> Result<RenderFrame> {
        let now_ms = self.clock.now_ms();
        let mut st = self.lock()?;
        st.debouncer.cancel();
        self.frame(&st, now_ms)
    }

    /// Milliseconds until the pending render is due.
    pub fn render_due_in(&self) -> Result<Option<u64>> {
        let now_ms = self.clock.now_ms();
        Ok(self.lock()?.debouncer.time_until_due(now_ms))
    }

    fn frame(&self, st: &State, now_ms: i64) -> Result<RenderFrame> {
        let series = build_series(st.samples.samples(), now_ms, &self.cfg.series)?;
        let visible_s = st.viewport.visible_seconds(series.window_s);
        Ok(RenderFrame {
            generated_at_ms: now_ms,
            series,
            viewport: st.viewport,
            visible_s,
        })
    }

    /// Change the chart zoom by `factor`; returns the clamped zoom.
    pub fn zoom_by(&self, factor: f64) -> Result<f64> {
        let now_ms = self.clock.now_ms();
        let mut st = self.lock()?;
        let z = st.viewport.zoom_by(factor);
        st.debouncer.request(now_ms);
        Ok(z)
    }

    pub fn reset_zoom(&self) -> Result<()> {
        self.lock()?.viewport.reset();
        Ok(())
    }

    pub fn last_dose(&self) -> Result<Option<DoseEvent>> {
        Ok(self.lock()?.guard.last_dose().cloned())
    }

    /// Up to `n` most recent doses, newest first.
    pub fn recent_doses(&self, n: usize) -> Result<Vec<DoseEvent>> {
        Ok(self.lock()?.guard.recent(n))
    }

    /// Samples in `range`, newest first.
    pub fn readings_in(&self, range: TimeRange) -> Result<Vec<Sample>> {
        let now_ms = self.clock.now_ms();
        let st = self.lock()?;
        Ok(range
            .filter(st.samples.samples(), now_ms)
            .iter()
            .rev()
            .copied()
            .collect())
    }

    pub fn samples(&self) -> Result<Vec<Sample>> {
        Ok(self.lock()?.samples.samples().to_vec())
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let now_ms = self.clock.now_ms();
        let range = self.targets.current();
        let st = self.lock()?;
        let latest = st.samples.latest().copied();
        let classification = match latest {
            Some(s) => Some(classify(s.value(), &range)?),
            None => None,
        };
        Ok(Snapshot {
            now_ms,
            latest,
            classification,
            range,
            scale_position: latest.map(|s| crate::threshold::scale_position(s.value())),
            last_dose: st.guard.last_dose().cloned(),
            in_cooldown: st.guard.in_cooldown(now_ms),
            sample_count: st.samples.len(),
            dose_count: st.guard.events().len(),
        })
    }
}

impl Drop for PhMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
