#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = ph_config::load_toml(data) {
        if cfg.validate().is_ok() {
            let _ = ph_core::MonitorCfg::try_from(&cfg);
            for c in &cfg.crops {
                let _ = ph_core::Crop::try_from(c);
            }
        }
    }
});
