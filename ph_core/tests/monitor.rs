use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::time::Duration;

use ph_core::mocks::{FailingStore, NoopProbe, ScriptedProbe};
use ph_core::{
    Crop, CropTargets, FixedTarget, MemoryStore, MonitorCfg, PhError, PhMonitor, PhStatus,
    PumpAction, Sample, TargetProvider, TargetRange, TickOutcome, TimeRange,
};
use ph_traits::{KeyValueStore, ManualClock, PhProbe};

const T0: i64 = 1_700_000_000_000;

fn fixed() -> Arc<dyn TargetProvider + Send + Sync> {
    Arc::new(FixedTarget(TargetRange::default()))
}

fn monitor_with(store: Option<Arc<dyn KeyValueStore + Send + Sync>>, clock: &ManualClock) -> PhMonitor {
    let mut b = PhMonitor::builder()
        .with_probe(NoopProbe)
        .with_targets(fixed())
        .with_clock(clock.clone());
    if let Some(store) = store {
        b = b.with_store(store);
    }
    b.try_build().expect("valid monitor")
}

fn sample(ts: i64, v: f64) -> Sample {
    Sample::new(ts, v).expect("valid sample")
}

fn recorded(outcome: TickOutcome) -> ph_core::Reading {
    match outcome {
        TickOutcome::Recorded(r) => r,
        other => panic!("expected a recorded reading, got {other:?}"),
    }
}

#[test]
fn acidic_samples_dose_base_once_within_cooldown() {
    let clock = ManualClock::new(5_000);
    let m = monitor_with(None, &clock);

    let first = recorded(m.ingest(sample(0, 6.0)).expect("ingest"));
    assert_eq!(first.classification.status, PhStatus::TooAcidic);
    assert_eq!(first.classification.action, PumpAction::Basic);
    let dose = first.dose.expect("first breach doses");
    assert_eq!(dose.kind(), ph_core::DoseKind::Basic);

    let second = recorded(m.ingest(sample(5_000, 6.2)).expect("ingest"));
    assert_eq!(second.classification.status, PhStatus::TooAcidic);
    assert!(second.dose.is_none());
    assert!(second.dose_suppressed);

    assert_eq!(m.recent_doses(10).expect("doses").len(), 1);
}

#[test]
fn earlier_timestamp_is_rejected_as_clock_skew() {
    let clock = ManualClock::new(T0);
    let m = monitor_with(None, &clock);
    m.ingest(sample(T0, 7.0)).expect("first");
    m.ingest(sample(T0, 7.1)).expect("equal timestamp accepted");

    let err = m.ingest(sample(T0 - 1, 7.0)).expect_err("older sample");
    match err.downcast_ref::<PhError>() {
        Some(PhError::ClockSkew { latest_ms, got_ms }) => {
            assert_eq!(*latest_ms, T0);
            assert_eq!(*got_ms, T0 - 1);
        }
        other => panic!("expected ClockSkew, got {other:?}"),
    }
    assert_eq!(m.samples().expect("samples").len(), 2);
}

#[test]
fn store_outage_leaves_memory_consistent() {
    let clock = ManualClock::new(T0);
    let store = FailingStore::default();
    let m = monitor_with(Some(Arc::new(store.clone())), &clock);

    m.ingest(sample(T0, 7.0)).expect("stored");
    store.set_failing(true);
    let err = m.ingest(sample(T0 + 5_000, 5.0)).expect_err("store down");
    assert!(matches!(
        err.downcast_ref::<PhError>(),
        Some(PhError::StoreUnavailable(_))
    ));
    assert_eq!(m.samples().expect("samples").len(), 1);
    assert!(m.last_dose().expect("dose").is_none());

    store.set_failing(false);
    let r = recorded(m.ingest(sample(T0 + 10_000, 5.0)).expect("stored"));
    assert!(r.dose.is_some());
    let persisted = store
        .inner()
        .read_all("users/local/phReadings")
        .expect("read");
    assert_eq!(persisted.len(), 2);
}

struct BlockingProbe {
    entered: Arc<Barrier>,
    release: mpsc::Receiver<()>,
}

impl PhProbe for BlockingProbe {
    fn read(&mut self, _t: Duration) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        self.entered.wait();
        let _ = self.release.recv();
        Ok(7.0)
    }
}

#[test]
fn tick_during_cycle_is_dropped_not_queued() {
    let entered = Arc::new(Barrier::new(2));
    let (release_tx, release_rx) = mpsc::channel();
    let clock = ManualClock::new(T0);
    let m = Arc::new(
        PhMonitor::builder()
            .with_probe(BlockingProbe {
                entered: entered.clone(),
                release: release_rx,
            })
            .with_targets(fixed())
            .with_clock(clock.clone())
            .try_build()
            .expect("monitor"),
    );

    let worker = {
        let m = m.clone();
        std::thread::spawn(move || m.tick_at(T0).expect("tick"))
    };
    entered.wait();
    // readers are not held up by a slow probe read
    assert_eq!(m.stats().expect("stats").sample_count, 0);
    assert!(m.snapshot().expect("snapshot").latest.is_none());
    let second = m.tick_at(T0 + 5_000).expect("tick");
    assert_eq!(second, TickOutcome::Dropped);
    release_tx.send(()).expect("release");
    let first = worker.join().expect("join");
    assert!(matches!(first, TickOutcome::Recorded(_)));
    assert_eq!(m.dropped_ticks(), 1);
    assert_eq!(m.samples().expect("samples").len(), 1);
}

#[test]
fn probe_ticks_use_tick_time() {
    let clock = ManualClock::new(T0);
    let m = PhMonitor::builder()
        .with_probe(ScriptedProbe::new([7.0, 8.2]))
        .with_targets(fixed())
        .with_clock(clock)
        .try_build()
        .expect("monitor");
    let a = recorded(m.tick_at(T0).expect("tick"));
    assert_eq!(a.sample.timestamp_ms(), T0);
    let b = recorded(m.tick_at(T0 + 5_000).expect("tick"));
    assert_eq!(b.classification.status, PhStatus::TooBasic);
    assert_eq!(b.dose.map(|d| d.kind()), Some(ph_core::DoseKind::Acidic));
    let err = m.tick_at(T0 + 10_000).expect_err("script exhausted");
    assert!(matches!(err.downcast_ref::<PhError>(), Some(PhError::Sensor(_))));
}

#[test]
fn stop_releases_subscriptions_and_refuses_ticks() {
    let clock = ManualClock::new(T0);
    let store = MemoryStore::new();
    let m = monitor_with(Some(Arc::new(store.clone())), &clock);
    m.follow().expect("follow");
    assert_eq!(store.subscriber_count("users/local/phReadings"), 1);
    assert_eq!(m.subscription_count(), 1);

    m.stop();
    assert_eq!(store.subscriber_count("users/local/phReadings"), 0);
    assert_eq!(m.subscription_count(), 0);
    assert!(m.is_stopped());
    assert_eq!(m.ingest(sample(T0, 7.0)).expect("stopped"), TickOutcome::Stopped);
    m.stop();
}

#[test]
fn followed_samples_from_other_writers_are_merged() {
    let clock = ManualClock::new(T0);
    let store = MemoryStore::new();
    let m = monitor_with(Some(Arc::new(store.clone())), &clock);
    m.follow().expect("follow");

    let remote = serde_json::to_string(&sample(T0 + 1_000, 6.9)).expect("encode");
    store
        .append("users/local/phReadings", &remote)
        .expect("remote append");
    m.ingest(sample(T0 + 2_000, 7.0)).expect("ingest");

    let samples = m.samples().expect("samples");
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].value(), 6.9);
    // our own append came back through the subscription but is not duplicated
    m.ingest(sample(T0 + 3_000, 7.0)).expect("ingest");
    assert_eq!(m.samples().expect("samples").len(), 3);
}

#[test]
fn load_restores_state_and_cooldown() {
    let clock = ManualClock::new(T0);
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    {
        let m = monitor_with(Some(store.clone()), &clock);
        m.ingest(sample(T0, 5.0)).expect("ingest");
        m.ingest(sample(T0 + 5_000, 5.1)).expect("ingest");
    }
    store
        .append("users/local/phReadings", "{not json")
        .expect("append junk");

    clock.set_ms(T0 + 6_000);
    let m = monitor_with(Some(store.clone()), &clock);
    let loaded = m.load().expect("load");
    assert_eq!(loaded.samples, 2);
    assert_eq!(loaded.doses, 1);
    let snap = m.snapshot().expect("snapshot");
    assert!(snap.in_cooldown);
    assert_eq!(snap.latest.map(|s| s.value()), Some(5.1));

    let r = recorded(m.ingest(sample(T0 + 6_000, 5.2)).expect("ingest"));
    assert!(r.dose_suppressed);
}

#[test]
fn load_drops_expired_records() {
    let clock = ManualClock::new(T0);
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    {
        let m = monitor_with(Some(store.clone()), &clock);
        m.ingest(sample(T0, 7.0)).expect("ingest");
    }
    clock.set_ms(T0 + 31 * 86_400_000);
    let m = monitor_with(Some(store), &clock);
    assert_eq!(m.load().expect("load").samples, 0);
}

#[test]
fn clear_wipes_memory_and_store() {
    let clock = ManualClock::new(T0);
    let store = MemoryStore::new();
    let m = monitor_with(Some(Arc::new(store.clone())), &clock);
    m.ingest(sample(T0, 5.0)).expect("ingest");
    m.clear().expect("clear");
    assert!(m.samples().expect("samples").is_empty());
    assert!(m.last_dose().expect("dose").is_none());
    assert!(store.read_all("users/local/phReadings").expect("read").is_empty());
    assert!(store.read_all("users/local/pumpLogs").expect("read").is_empty());
    assert!(!m.snapshot().expect("snapshot").in_cooldown);
}

#[test]
fn cleared_samples_do_not_return_through_follow() {
    let clock = ManualClock::new(T0);
    let store = MemoryStore::new();
    let m = monitor_with(Some(Arc::new(store.clone())), &clock);
    m.follow().expect("follow");

    m.ingest(sample(T0, 5.0)).expect("ingest");
    m.clear().expect("clear");
    m.ingest(sample(T0 + 20_000, 7.0)).expect("ingest");

    let ts: Vec<i64> = m
        .samples()
        .expect("samples")
        .iter()
        .map(Sample::timestamp_ms)
        .collect();
    assert_eq!(ts, vec![T0 + 20_000]);
    assert_eq!(store.read_all("users/local/phReadings").expect("read").len(), 1);
    assert_eq!(m.stats().expect("stats").sample_count, 1);
}

#[test]
fn concurrent_readers_never_drop_ticks() {
    let clock = ManualClock::new(T0);
    let m = Arc::new(monitor_with(None, &clock));
    for i in 0..2_000 {
        m.ingest(sample(T0 - 2_000_000 + i, 7.0)).expect("preload");
    }

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let m = m.clone();
        let done = done.clone();
        std::thread::spawn(move || {
            let mut reads = 0u64;
            while !done.load(Ordering::Relaxed) {
                m.stats().expect("stats");
                m.snapshot().expect("snapshot");
                reads += 1;
            }
            reads
        })
    };

    let mut recorded = 0;
    for i in 0..500 {
        let outcome = m.ingest(sample(T0 + i * 1_000, 7.0)).expect("ingest");
        if matches!(outcome, TickOutcome::Recorded(_)) {
            recorded += 1;
        }
    }
    done.store(true, Ordering::Relaxed);
    let reads = reader.join().expect("join");

    assert!(reads > 0);
    assert_eq!(recorded, 500);
    assert_eq!(m.dropped_ticks(), 0);
}

#[test]
fn zoom_resets_to_default() {
    let clock = ManualClock::new(T0);
    let m = monitor_with(None, &clock);
    m.ingest(sample(T0, 7.0)).expect("ingest");
    assert_eq!(m.zoom_by(3.0).expect("zoom"), 3.0);
    m.reset_zoom().expect("reset");
    assert_eq!(m.render_now().expect("frame").viewport.zoom(), 1.0);
}

#[test]
fn renders_are_debounced_and_coalesced() {
    let clock = ManualClock::new(T0);
    let m = monitor_with(None, &clock);
    m.ingest(sample(T0, 7.0)).expect("ingest");
    clock.advance(Duration::from_millis(200));
    m.ingest(sample(T0 + 200, 7.0)).expect("ingest");
    assert!(m.poll_render().expect("poll").is_none());
    assert_eq!(m.render_due_in().expect("due"), Some(300));

    clock.advance(Duration::from_millis(300));
    let frame = m.poll_render().expect("poll").expect("due now");
    assert_eq!(frame.series.current(), Some(7.0));
    assert!(m.poll_render().expect("poll").is_none());
}

#[test]
fn crop_change_takes_effect_on_next_sample() {
    let targets = Arc::new(CropTargets::new(
        vec![Crop::new("rice", 5.5, 6.5).expect("crop")],
        TargetRange::default(),
    ));
    let notified = Arc::new(AtomicUsize::new(0));
    let n = notified.clone();
    targets.on_change(Box::new(move |_| {
        n.fetch_add(1, Ordering::SeqCst);
    }));
    let clock = ManualClock::new(T0);
    let m = PhMonitor::builder()
        .with_probe(NoopProbe)
        .with_targets(targets.clone())
        .with_clock(clock)
        .try_build()
        .expect("monitor");

    let before = recorded(m.ingest(sample(T0, 6.0)).expect("ingest"));
    assert_eq!(before.classification.status, PhStatus::TooAcidic);
    targets.select("Rice").expect("known crop");
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    let after = recorded(m.ingest(sample(T0 + 5_000, 6.0)).expect("ingest"));
    assert_eq!(after.classification.status, PhStatus::Optimal);
    assert!(targets.select("kale").is_err());

    targets
        .set_range(TargetRange::new(6.5, 7.0).expect("range"))
        .expect("custom range");
    assert_eq!(targets.selected(), None);
    assert_eq!(notified.load(Ordering::SeqCst), 2);
    let custom = recorded(m.ingest(sample(T0 + 10_000, 6.0)).expect("ingest"));
    assert_eq!(custom.classification.status, PhStatus::TooAcidic);
}

#[test]
fn readings_in_range_are_newest_first() {
    let clock = ManualClock::new(T0);
    let m = monitor_with(None, &clock);
    let day = 86_400_000;
    m.ingest(sample(T0 - 2 * day, 7.0)).expect("ingest");
    m.ingest(sample(T0 - 1_000, 7.1)).expect("ingest");
    m.ingest(sample(T0, 7.2)).expect("ingest");
    let day_view = m.readings_in(TimeRange::Day).expect("readings");
    assert_eq!(day_view.iter().map(Sample::value).collect::<Vec<_>>(), vec![7.2, 7.1]);
    assert_eq!(m.readings_in(TimeRange::Week).expect("readings").len(), 3);
}

#[test]
fn config_controls_cooldown() {
    let clock = ManualClock::new(T0);
    let m = PhMonitor::builder()
        .with_probe(NoopProbe)
        .with_targets(fixed())
        .with_clock(clock)
        .with_config(MonitorCfg {
            cooldown_ms: 1_000,
            ..MonitorCfg::default()
        })
        .try_build()
        .expect("monitor");
    m.ingest(sample(T0, 5.0)).expect("ingest");
    m.ingest(sample(T0 + 1_000, 5.0)).expect("ingest");
    assert_eq!(m.stats().expect("stats").count_by_kind.basic, 2);
}
