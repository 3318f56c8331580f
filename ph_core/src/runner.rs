//! Drive a monitor from a tick source until it closes, a tick budget is
//! spent, or shutdown is requested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{PhError, Result};
use crate::monitor::{PhMonitor, RenderFrame};
use crate::status::{Reading, TickOutcome};
use crate::ticker::{TickSource, TickWait};

/// How long one wait for a tick may block before shutdown is rechecked.
pub const DEFAULT_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    /// Stop after this many ticks have been handled (recorded, dropped or
    /// rejected).
    pub max_ticks: Option<u64>,
    pub poll: Duration,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            max_ticks: None,
            poll: DEFAULT_POLL,
        }
    }
}

#[derive(Debug)]
pub enum RunEvent<'a> {
    Reading(&'a Reading),
    Dropped,
    /// A sample or probe read was refused; the loop carries on.
    Rejected(&'a PhError),
    Render(&'a RenderFrame),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub recorded: u64,
    pub doses: u64,
    pub suppressed: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub renders: u64,
}

/// Errors that reject one input without ending the run.
fn is_rejection(e: &PhError) -> bool {
    matches!(
        e,
        PhError::InvalidInput(_) | PhError::ClockSkew { .. } | PhError::Sensor(_)
    )
}

/// Run until the source closes, `opts.max_ticks` is reached, `shutdown` is
/// set, or the monitor is stopped. Store failures end the run with an error.
pub fn run<F>(
    monitor: &PhMonitor,
    ticks: &mut dyn TickSource,
    opts: RunOpts,
    shutdown: &AtomicBool,
    mut on_event: F,
) -> Result<RunSummary>
where
    F: FnMut(RunEvent<'_>),
{
    let mut summary = RunSummary::default();
    tracing::info!(max_ticks = ?opts.max_ticks, "monitor run started");

    loop {
        if shutdown.load(Ordering::Relaxed) || monitor.is_stopped() {
            tracing::debug!("run interrupted");
            break;
        }
        if opts.max_ticks.is_some_and(|m| summary.ticks >= m) {
            break;
        }

        match ticks.wait_tick(opts.poll) {
            TickWait::Tick(ts) => {
                summary.ticks += 1;
                match monitor.tick_at(ts) {
                    Ok(TickOutcome::Recorded(r)) => {
                        summary.recorded += 1;
                        if r.dose.is_some() {
                            summary.doses += 1;
                        }
                        if r.dose_suppressed {
                            summary.suppressed += 1;
                        }
                        on_event(RunEvent::Reading(&r));
                    }
                    Ok(TickOutcome::Dropped) => {
                        summary.dropped += 1;
                        on_event(RunEvent::Dropped);
                    }
                    Ok(TickOutcome::Stopped) => break,
                    Err(report) => match report.downcast_ref::<PhError>() {
                        Some(e) if is_rejection(e) => {
                            summary.rejected += 1;
                            tracing::warn!(error = %e, "tick rejected");
                            on_event(RunEvent::Rejected(e));
                        }
                        _ => return Err(report),
                    },
                }
            }
            TickWait::Timeout => {}
            TickWait::Closed => break,
        }

        if let Some(frame) = monitor.poll_render()? {
            summary.renders += 1;
            on_event(RunEvent::Render(&frame));
        }
    }

    tracing::info!(
        ticks = summary.ticks,
        recorded = summary.recorded,
        doses = summary.doses,
        dropped = summary.dropped,
        rejected = summary.rejected,
        "monitor run finished"
    );
    Ok(summary)
}
