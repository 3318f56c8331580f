//! Collaborator seams for the pH monitor: time, the pH probe, and the
//! persistent key-value store. Implementations live in `ph_core` (simulated
//! probe, memory/file stores) or in downstream integrations.
pub mod clock;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{KeyValueStore, StoreError, Subscription, SubscriptionCallback};

/// A pH sensor (real probe or simulated generator).
pub trait PhProbe {
    /// Take one reading. The returned value is validated by the caller, so
    /// implementations may pass through whatever the hardware reports.
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
}
