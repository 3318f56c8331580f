#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Soil pH monitoring and correction engine.
//!
//! Hardware and storage are reached only through `ph_traits`
//! (`PhProbe`, `Clock`, `KeyValueStore`).
//!
//! ## Architecture
//!
//! - **Sample store**: time-ordered samples under a retention window (`samples`)
//! - **Threshold controller**: classify a reading, pick a pump (`threshold`)
//! - **Dosing guard**: cooldown-gated dose log (`guard`)
//! - **Stats**: average/min/max and dose counts (`stats`)
//! - **Renderer**: forward-filled series and zoom viewport (`series`, `viewport`)
//! - **Session**: `PhMonitor` with single-flight ticks, debounced renders,
//!   store subscriptions and `stop()` (`monitor`, `runner`, `ticker`)

pub mod atomic;
pub mod backends;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod crop;
pub mod debounce;
pub mod error;
pub mod guard;
pub mod mocks;
pub mod monitor;
pub mod persist;
pub mod runner;
pub mod sample;
pub mod samples;
pub mod series;
pub mod sim;
pub mod stats;
pub mod status;
pub mod threshold;
pub mod ticker;
pub mod timefmt;
pub mod util;
pub mod viewport;

pub use backends::{FileStore, MemoryStore};
pub use builder::MonitorBuilder;
pub use config::MonitorCfg;
pub use crop::{Crop, CropTargets, FixedTarget, TargetProvider};
pub use debounce::Debouncer;
pub use error::{BuildError, PhError, Result};
pub use guard::{DosingGuard, ReagentLabels};
pub use monitor::{DEFAULT_RECENT, LoadSummary, PhMonitor, RenderFrame, Snapshot};
pub use runner::{RunEvent, RunOpts, RunSummary, run};
pub use sample::{DoseEvent, DoseKind, Sample};
pub use samples::SampleStore;
pub use series::{Series, SeriesParams, SeriesPoint, build_series};
pub use sim::{SimParams, SimulatedProbe};
pub use stats::{DoseCounts, PhStats, compute_stats};
pub use status::{Reading, TickOutcome};
pub use threshold::{
    Classification, PhStatus, PumpAction, TargetRange, classify, scale_position,
};
pub use ticker::{ManualTicks, TickSource, TickWait, Ticker};
pub use timefmt::{TimeRange, time_ago};
pub use viewport::Viewport;
