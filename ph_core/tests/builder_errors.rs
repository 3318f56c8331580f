use std::sync::Arc;

use ph_core::error::BuildError;
use ph_core::mocks::NoopProbe;
use ph_core::{FixedTarget, MonitorCfg, PhMonitor, TargetRange};
use rstest::rstest;

#[rstest]
fn missing_probe_yields_typed_build_error() {
    let err = PhMonitor::builder()
        .with_targets(Arc::new(FixedTarget(TargetRange::default())))
        .try_build()
        .expect_err("should fail with MissingProbe");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingProbe) => {}
        other => panic!("expected MissingProbe, got: {other:?}"),
    }
}

#[rstest]
fn missing_targets_yields_typed_build_error() {
    let err = PhMonitor::builder()
        .with_probe(NoopProbe)
        .try_build()
        .expect_err("should fail with MissingTargets");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingTargets)
    ));
}

#[rstest]
#[case::zero_cooldown(MonitorCfg { cooldown_ms: 0, ..MonitorCfg::default() })]
#[case::bad_zoom(MonitorCfg { zoom: 5.0, ..MonitorCfg::default() })]
#[case::slash_user(MonitorCfg { user: "a/b".into(), ..MonitorCfg::default() })]
#[case::no_retention(MonitorCfg { retention_ms: 0, ..MonitorCfg::default() })]
fn invalid_config_is_rejected(#[case] cfg: MonitorCfg) {
    let err = PhMonitor::builder()
        .with_probe(NoopProbe)
        .with_targets(Arc::new(FixedTarget(TargetRange::default())))
        .with_config(cfg)
        .try_build()
        .expect_err("invalid config");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}
