//! Config loading and monitor wiring shared by the subcommands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::WrapErr;
use ph_core::{
    Crop, CropTargets, FileStore, MonitorCfg, PhError, PhMonitor, SimParams, SimulatedProbe,
    TargetRange,
};
use ph_traits::PhProbe;

use crate::cli::{Cli, DEFAULT_CONFIG};

/// Read and validate the config named by `--config`, falling back to
/// `etc/phmon.toml` when present and to defaults otherwise.
pub fn load_config(cli: &Cli) -> eyre::Result<ph_config::Config> {
    let path = match &cli.config {
        Some(p) => Some(p.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.exists()),
    };
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(&p)
                .wrap_err_with(|| format!("read config {}", p.display()))?;
            ph_config::load_toml(&text)
                .map_err(|e| PhError::Config(format!("parse {}: {e}", p.display())))?
        }
        None => ph_config::Config::default(),
    };

    if let Some(dir) = &cli.store_dir {
        cfg.store.dir = dir.display().to_string();
    }
    if let Some(user) = &cli.user {
        cfg.store.user.clone_from(user);
    }
    if let Some(csv) = &cli.crops_csv {
        let extra = ph_config::load_crops_csv(csv)
            .map_err(|e| PhError::Config(format!("{e:#}")))?;
        cfg.crops.extend(extra);
    }
    cfg.validate()
        .map_err(|e| PhError::Config(format!("invalid configuration: {e:#}")))?;
    Ok(cfg)
}

pub struct App {
    pub cfg: ph_config::Config,
    pub json: bool,
}

impl App {
    pub fn new(cfg: ph_config::Config, json: bool) -> Self {
        Self { cfg, json }
    }

    pub fn store_dir(&self) -> &Path {
        Path::new(&self.cfg.store.dir)
    }

    pub fn catalog(&self) -> eyre::Result<Vec<Crop>> {
        let crops = self
            .cfg
            .crops
            .iter()
            .map(Crop::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(crops)
    }

    /// Crop targets seeded from `[target]`, with `crop` (or the configured
    /// `[target].crop`, when it names a catalog entry) selected.
    pub fn targets(&self, crop: Option<&str>) -> eyre::Result<Arc<CropTargets>> {
        let initial = TargetRange::try_from(&self.cfg.target)?;
        let targets = Arc::new(CropTargets::new(self.catalog()?, initial));
        match crop {
            Some(name) => {
                targets.select(name)?;
            }
            None => {
                let configured = self.cfg.target.crop.as_str();
                if targets.find(configured).is_some() {
                    targets.select(configured)?;
                }
            }
        }
        Ok(targets)
    }

    pub fn store(&self) -> eyre::Result<Arc<FileStore>> {
        let store = FileStore::open(self.store_dir())
            .map_err(|e| PhError::StoreUnavailable(e.to_string()))?;
        Ok(Arc::new(store))
    }

    pub fn monitor_cfg(&self) -> eyre::Result<MonitorCfg> {
        Ok(MonitorCfg::try_from(&self.cfg)?)
    }

    pub fn simulated_probe(&self, seed: Option<u64>) -> eyre::Result<SimulatedProbe> {
        let mut params = SimParams::from(&self.cfg.simulator);
        if seed.is_some() {
            params.seed = seed;
        }
        Ok(SimulatedProbe::new(params)?)
    }

    /// A file-backed monitor with state loaded from the store.
    pub fn monitor(
        &self,
        probe: Box<dyn PhProbe + Send>,
        crop: Option<&str>,
    ) -> eyre::Result<PhMonitor> {
        let monitor = PhMonitor::builder()
            .with_boxed_probe(probe)
            .with_targets(self.targets(crop)?)
            .with_store(self.store()?)
            .with_config(self.monitor_cfg()?)
            .try_build()?;
        monitor.load()?;
        Ok(monitor)
    }

    /// A monitor for read-only commands.
    pub fn viewer(&self, crop: Option<&str>) -> eyre::Result<PhMonitor> {
        self.monitor(Box::new(ph_core::mocks::NoopProbe), crop)
    }
}
