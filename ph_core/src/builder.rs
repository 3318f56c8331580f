//! Builder for `PhMonitor`.
//!
//! A probe and a target provider are required; the clock defaults to
//! `SystemClock` and the store is optional (memory-only session).

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};

use ph_traits::{Clock, PhProbe, SystemClock};

use crate::config::MonitorCfg;
use crate::crop::TargetProvider;
use crate::debounce::Debouncer;
use crate::error::{BuildError, Result};
use crate::guard::DosingGuard;
use crate::monitor::{PhMonitor, State};
use crate::persist::{RecordLog, SharedStore, doses_path, readings_path};
use crate::samples::SampleStore;
use crate::viewport::Viewport;

#[derive(Default)]
pub struct MonitorBuilder {
    probe: Option<Box<dyn PhProbe + Send>>,
    targets: Option<Arc<dyn TargetProvider + Send + Sync>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    store: Option<SharedStore>,
    cfg: Option<MonitorCfg>,
}

impl MonitorBuilder {
    pub fn with_probe(mut self, probe: impl PhProbe + Send + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    pub fn with_boxed_probe(mut self, probe: Box<dyn PhProbe + Send>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_targets(mut self, targets: Arc<dyn TargetProvider + Send + Sync>) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Persist samples and doses under `users/<cfg.user>/...` in `store`.
    pub fn with_store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, cfg: MonitorCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Validate and construct the monitor.
    pub fn try_build(self) -> Result<PhMonitor> {
        let probe = self
            .probe
            .ok_or_else(|| eyre::Report::new(BuildError::MissingProbe))?;
        let targets = self
            .targets
            .ok_or_else(|| eyre::Report::new(BuildError::MissingTargets))?;
        let cfg = self.cfg.unwrap_or_default();

        if cfg.cooldown_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "cooldown_ms must be >= 1",
            )));
        }
        if cfg.retention_ms <= 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "retention must be positive",
            )));
        }
        if cfg.series.step_s == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "series step_s must be >= 1",
            )));
        }
        if cfg.user.trim().is_empty() || cfg.user.contains('/') {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "user id must be non-empty and contain no '/'",
            )));
        }
        let viewport = Viewport::new(cfg.zoom, cfg.series.min_window_s)
            .map_err(|_| eyre::Report::new(BuildError::InvalidConfig("zoom outside [0.5, 4.0]")))?;

        let readings = self
            .store
            .as_ref()
            .map(|s| RecordLog::new(s.clone(), readings_path(&cfg.user)));
        let doses = self
            .store
            .as_ref()
            .map(|s| RecordLog::new(s.clone(), doses_path(&cfg.user)));

        let mut samples = SampleStore::new(cfg.retention_ms);
        if let Some(log) = &readings {
            samples = samples.with_log(log.clone());
        }
        let mut guard = DosingGuard::new(cfg.cooldown_ms).with_retention(cfg.retention_ms);
        if let Some(log) = &doses {
            guard = guard.with_log(log.clone());
        }

        let state = State {
            samples,
            guard,
            debouncer: Debouncer::new(cfg.debounce_ms),
            viewport,
            followed: None,
        };

        Ok(PhMonitor {
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            targets,
            probe: Mutex::new(probe),
            readings,
            doses,
            state: Mutex::new(state),
            subscriptions: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            dropped_ticks: AtomicU64::new(0),
            cfg,
        })
    }
}
