//! Human-readable error descriptions and structured JSON error formatting.

use ph_core::{BuildError, PhError};
use serde_json::json;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingProbe => {
                "What happened: No pH probe was provided to the monitor.\nLikely causes: The probe failed to initialize or was not wired into the builder.\nHow to fix: Pass a probe via with_probe(...) before try_build().".to_string()
            }
            BuildError::MissingTargets => {
                "What happened: No target range provider was configured.\nLikely causes: The builder was not given crop targets.\nHow to fix: Pass targets via with_targets(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/phmon.toml for a sample."
            ),
        };
    }

    if let Some(pe) = err.downcast_ref::<PhError>() {
        return match pe {
            PhError::InvalidInput(msg) => format!(
                "What happened: {msg}.\nLikely causes: A value outside the accepted range or an unknown name.\nHow to fix: Check the command arguments (see --help)."
            ),
            PhError::StoreUnavailable(msg) => format!(
                "What happened: The record store could not be used ({msg}).\nLikely causes: Store directory missing, unwritable, or on a full disk.\nHow to fix: Check [store].dir (or --store-dir) and its permissions, then retry."
            ),
            PhError::ClockSkew { latest_ms, got_ms } => format!(
                "What happened: A reading at {got_ms} ms is older than the newest stored reading at {latest_ms} ms.\nLikely causes: The system clock moved backwards or two writers share one store.\nHow to fix: Correct the clock; readings resume once time passes the stored history."
            ),
            PhError::Sensor(msg) => format!(
                "What happened: The pH probe could not be read ({msg}).\nLikely causes: Probe disconnected or read timeout too low.\nHow to fix: Check the probe, and consider raising the probe timeout."
            ),
            PhError::Config(msg) => format!(
                "What happened: Configuration is invalid or unreadable ({msg}).\nLikely causes: Out-of-range pH bounds, malformed TOML, or a bad crops CSV.\nHow to fix: Run `phmon health` after editing the config."
            ),
            PhError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: An earlier failure left shared state poisoned, or an operation that needs a store ran without one.\nHow to fix: Restart phmon; if it persists, re-run with --log-level=debug and check the preceding errors."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 invalid input, 3 clock skew, 4 store unavailable,
/// 5 configuration, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 5;
    }
    match err.downcast_ref::<PhError>() {
        Some(PhError::InvalidInput(_)) => 2,
        Some(PhError::ClockSkew { .. }) => 3,
        Some(PhError::StoreUnavailable(_)) => 4,
        Some(PhError::Config(_)) => 5,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<PhError>() {
        Some(PhError::InvalidInput(_)) => "InvalidInput",
        Some(PhError::StoreUnavailable(_)) => "StoreUnavailable",
        Some(PhError::ClockSkew { .. }) => "ClockSkew",
        Some(PhError::Sensor(_)) => "Sensor",
        Some(PhError::Config(_)) => "Config",
        Some(PhError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let reason = reason_name(err);
    if let Some(PhError::ClockSkew { latest_ms, got_ms }) = err.downcast_ref::<PhError>() {
        return json!({
            "reason": reason,
            "details": { "latest_ms": latest_ms, "got_ms": got_ms },
            "message": humanize(err),
        })
        .to_string();
    }
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        let e: eyre::Report = PhError::InvalidInput("x".into()).into();
        assert_eq!(exit_code_for_error(&e), 2);
        let e: eyre::Report = PhError::ClockSkew {
            latest_ms: 2,
            got_ms: 1,
        }
        .into();
        assert_eq!(exit_code_for_error(&e), 3);
        let e: eyre::Report = PhError::StoreUnavailable("down".into()).into();
        assert_eq!(exit_code_for_error(&e), 4);
        let e: eyre::Report = BuildError::MissingProbe.into();
        assert_eq!(exit_code_for_error(&e), 5);
        assert_eq!(exit_code_for_error(&eyre::eyre!("other")), 1);
    }

    #[test]
    fn json_carries_reason_and_skew_details() {
        let e: eyre::Report = PhError::ClockSkew {
            latest_ms: 20,
            got_ms: 10,
        }
        .into();
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "ClockSkew");
        assert_eq!(v["details"]["latest_ms"], 20);
        assert!(v["message"].as_str().unwrap().contains("What happened"));
    }

    #[test]
    fn wrapped_errors_still_downcast() {
        use eyre::WrapErr;
        let r: eyre::Result<()> = Err(PhError::StoreUnavailable("disk".into()).into());
        let e = r.wrap_err("loading history").unwrap_err();
        assert_eq!(exit_code_for_error(&e), 4);
        assert!(humanize(&e).contains("store"));
    }
}
