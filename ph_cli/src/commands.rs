//! Subcommand implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ph_core::{
    DEFAULT_RECENT, DoseEvent, PhError, PhStats, Reading, RenderFrame, RunEvent, RunOpts,
    Series, Ticker, TimeRange, time_ago,
};
use ph_traits::{Clock, KeyValueStore, SystemClock};
use serde_json::json;

use crate::app::App;

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |x| format!("{x:.2}"))
}

fn dose_line(now_ms: i64, d: &DoseEvent) -> String {
    format!(
        "{} {} {} ({})",
        d.kind(),
        d.concentration(),
        d.reagent(),
        time_ago(now_ms, d.timestamp_ms())
    )
}

fn reading_json(r: &Reading) -> serde_json::Value {
    json!({
        "event": "reading",
        "timestamp": r.sample.timestamp_ms(),
        "ph": r.sample.value(),
        "status": r.classification.status,
        "action": r.classification.action,
        "dose": r.dose,
        "dose_suppressed": r.dose_suppressed,
    })
}

fn print_reading(app: &App, r: &Reading) {
    if app.json {
        println!("{}", reading_json(r));
        return;
    }
    let mut line = format!(
        "{} pH {:.2} {}",
        ph_core::timefmt::format_clock(r.sample.timestamp_ms()),
        r.sample.value(),
        r.classification.status
    );
    if let Some(d) = &r.dose {
        line.push_str(&format!(" -> dosed {} ({})", d.kind(), d.reagent()));
    } else if r.dose_suppressed {
        line.push_str(" -> dose held (cooldown)");
    }
    println!("{line}");
}

/// `phmon monitor`
pub fn monitor(
    app: &App,
    ticks: Option<u64>,
    interval_ms: Option<u64>,
    crop: Option<&str>,
    seed: Option<u64>,
) -> eyre::Result<()> {
    let probe = app.simulated_probe(seed)?;
    let monitor = app.monitor(Box::new(probe), crop)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    let interval = interval_ms.unwrap_or(app.cfg.ticker.interval_ms).max(1);
    let mut ticker = Ticker::spawn(Duration::from_millis(interval), SystemClock::new());
    let opts = RunOpts {
        max_ticks: ticks,
        poll: Duration::from_millis(interval.min(250)),
    };
    tracing::info!(interval_ms = interval, range = %monitor.target_range(), "monitoring");

    let summary = ph_core::run(&monitor, &mut ticker, opts, &shutdown, |ev| match ev {
        RunEvent::Reading(r) => print_reading(app, r),
        RunEvent::Rejected(e) => {
            if app.json {
                println!("{}", json!({ "event": "rejected", "error": e.to_string() }));
            } else {
                eprintln!("rejected: {e}");
            }
        }
        RunEvent::Dropped | RunEvent::Render(_) => {}
    })?;
    monitor.stop();

    if app.json {
        println!(
            "{}",
            json!({
                "event": "summary",
                "ticks": summary.ticks,
                "recorded": summary.recorded,
                "doses": summary.doses,
                "suppressed": summary.suppressed,
                "dropped": summary.dropped + ticker.missed(),
                "rejected": summary.rejected,
            })
        );
    } else {
        println!(
            "done: {} readings, {} doses, {} held by cooldown, {} ticks dropped",
            summary.recorded,
            summary.doses,
            summary.suppressed,
            summary.dropped + ticker.missed()
        );
    }
    Ok(())
}

/// `phmon status`
pub fn status(app: &App, crop: Option<&str>) -> eyre::Result<()> {
    let monitor = app.viewer(crop)?;
    let snap = monitor.snapshot()?;
    if app.json {
        println!("{}", serde_json::to_string(&snap)?);
        return Ok(());
    }
    match (snap.latest, snap.classification) {
        (Some(s), Some(c)) => {
            println!(
                "pH {:.2} ({}) target {} scale {:.1}%",
                s.value(),
                c.status,
                snap.range,
                snap.scale_position.unwrap_or_default()
            );
            println!("last reading: {}", time_ago(snap.now_ms, s.timestamp_ms()));
        }
        _ => println!("no readings yet (target {})", snap.range),
    }
    match &snap.last_dose {
        Some(d) => println!("last dose: {}", dose_line(snap.now_ms, d)),
        None => println!("last dose: none"),
    }
    if snap.in_cooldown {
        println!("dosing cooldown active");
    }
    Ok(())
}

fn print_stats(stats: &PhStats) {
    println!("average: {}", fmt_opt(stats.average));
    println!("min:     {}", fmt_opt(stats.min));
    println!("max:     {}", fmt_opt(stats.max));
    println!("samples: {}", stats.sample_count);
    println!(
        "doses:   {} acidic, {} basic",
        stats.count_by_kind.acidic, stats.count_by_kind.basic
    );
}

/// `phmon stats`
pub fn stats(app: &App) -> eyre::Result<()> {
    let monitor = app.viewer(None)?;
    let stats = monitor.stats()?;
    if app.json {
        println!("{}", serde_json::to_string(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn print_series(series: &Series, frame: &RenderFrame, all: bool) {
    let points = if all {
        series.points.as_slice()
    } else {
        frame.visible_points()
    };
    println!(
        "window {} s, showing {} s at zoom {:.2}{}",
        series.window_s,
        frame.visible_s,
        frame.viewport.zoom(),
        if series.discontinuous {
            " (discontinuous)"
        } else {
            ""
        }
    );
    if series.discontinuous {
        if let Some(ts) = series.last_reading_ms {
            println!("last reading at {}", ph_core::timefmt::format_clock(ts));
        }
    }
    for p in points {
        println!("{:>7} {}", p.offset_s, fmt_opt(p.value));
    }
}

/// `phmon series`
pub fn series(app: &App, zoom: Option<f64>, all: bool) -> eyre::Result<()> {
    let monitor = app.viewer(None)?;
    if let Some(z) = zoom {
        if !(ph_core::viewport::MIN_ZOOM..=ph_core::viewport::MAX_ZOOM).contains(&z) {
            return Err(PhError::InvalidInput(format!("zoom {z} outside [0.5, 4.0]")).into());
        }
        monitor.reset_zoom()?;
        monitor.zoom_by(z)?;
    }
    let frame = monitor.render_now()?;
    if app.json {
        let points = if all {
            frame.series.points.as_slice()
        } else {
            frame.visible_points()
        };
        println!(
            "{}",
            json!({
                "window_s": frame.series.window_s,
                "visible_s": frame.visible_s,
                "zoom": frame.viewport.zoom(),
                "discontinuous": frame.series.discontinuous,
                "last_reading_ms": frame.series.last_reading_ms,
                "points": points,
            })
        );
    } else {
        print_series(&frame.series, &frame, all);
    }
    Ok(())
}

/// `phmon log`
pub fn log(app: &App, range: &str, doses: bool, limit: Option<usize>) -> eyre::Result<()> {
    let monitor = app.viewer(None)?;
    let now_ms = monitor.now_ms();
    if doses {
        let recent = monitor.recent_doses(limit.unwrap_or(DEFAULT_RECENT))?;
        if app.json {
            println!("{}", serde_json::to_string(&recent)?);
        } else if recent.is_empty() {
            println!("no doses recorded");
        } else {
            for d in &recent {
                println!("{}", dose_line(now_ms, d));
            }
        }
        return Ok(());
    }

    let range: TimeRange = range.parse()?;
    let mut readings = monitor.readings_in(range)?;
    if let Some(n) = limit {
        readings.truncate(n);
    }
    if app.json {
        println!("{}", serde_json::to_string(&readings)?);
    } else if readings.is_empty() {
        println!("no readings in the last {range}");
    } else {
        let target = monitor.target_range();
        for s in &readings {
            let status = ph_core::classify(s.value(), &target)?.status;
            println!(
                "{:>14} pH {:.2} {}",
                time_ago(now_ms, s.timestamp_ms()),
                s.value(),
                status
            );
        }
    }
    Ok(())
}

/// `phmon crops`
pub fn crops(app: &App) -> eyre::Result<()> {
    let targets = app.targets(None)?;
    let selected = targets.selected();
    if app.json {
        let list: Vec<_> = targets
            .catalog()
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "min_ph": c.range.min(),
                    "max_ph": c.range.max(),
                    "selected": selected.as_deref() == Some(c.name.as_str()),
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(list));
        return Ok(());
    }
    if targets.catalog().is_empty() {
        println!(
            "no crops configured; target {}-{}",
            app.cfg.target.min_ph, app.cfg.target.max_ph
        );
        return Ok(());
    }
    for c in targets.catalog() {
        let mark = if selected.as_deref() == Some(c.name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{mark} {:<16} {}", c.name, c.range);
    }
    Ok(())
}

/// `phmon clear`
pub fn clear(app: &App, yes: bool) -> eyre::Result<()> {
    if !yes {
        return Err(PhError::InvalidInput("refusing to clear data without --yes".into()).into());
    }
    let monitor = app.viewer(None)?;
    monitor.clear()?;
    if app.json {
        println!("{}", json!({ "cleared": true, "user": app.cfg.store.user }));
    } else {
        println!("cleared all readings and doses for '{}'", app.cfg.store.user);
    }
    Ok(())
}

/// `phmon health`
pub fn health(app: &App) -> eyre::Result<()> {
    let store = app.store()?;
    let path = ph_core::persist::readings_path(&app.cfg.store.user);
    let records = store
        .read_all(&path)
        .map_err(|e| PhError::StoreUnavailable(e.to_string()))?;
    let now = SystemClock::new().now_ms();
    if app.json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "store": store.dir().display().to_string(),
                "records": records.len(),
                "checked_at": now,
            })
        );
    } else {
        println!(
            "ok: store {} ({} readings)",
            store.dir().display(),
            records.len()
        );
    }
    Ok(())
}
