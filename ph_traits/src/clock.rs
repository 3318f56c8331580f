use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock abstraction used for sample timestamps and windowing.
///
/// - now_ms(): current time in epoch milliseconds
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - ms_since(): helper to compute elapsed milliseconds since an earlier timestamp
pub trait Clock {
    fn now_ms(&self) -> i64;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `earlier_ms`, saturating at 0 when the clock
    /// reads earlier than `earlier_ms`.
    fn ms_since(&self, earlier_ms: i64) -> u64 {
        let delta = self.now_ms().saturating_sub(earlier_ms);
        u64::try_from(delta).unwrap_or(0)
    }
}

/// Real-time clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_ms(&self) -> i64 {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        i64::try_from(since_epoch.as_millis()).unwrap_or(i64::MAX)
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time is moved by hand.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// give another to the component under test. `sleep(d)` advances the time by
/// `d` without blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<Mutex<i64>>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(Mutex::new(start_ms)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        let step = i64::try_from(d.as_millis()).unwrap_or(i64::MAX);
        if let Ok(mut now) = self.now_ms.lock() {
            *now = now.saturating_add(step);
        }
    }

    /// Set the absolute time in epoch milliseconds.
    pub fn set_ms(&self, ms: i64) {
        if let Ok(mut now) = self.now_ms.lock() {
            *now = ms;
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.lock().map(|g| *g).unwrap_or(0)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
