//! Render debouncer.
//!
//! A render request arms a deadline `delay_ms` ahead. Further requests made
//! before it fires are folded into the pending one and do not push the
//! deadline back, so bursty input still renders at most once per delay.

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay_ms: i64,
    due_at: Option<i64>,
    coalesced: u64,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms: crate::util::ms_to_i64(delay_ms),
            due_at: None,
            coalesced: 0,
        }
    }

    /// Ask for a render. Returns `true` when this call armed a new deadline.
    pub fn request(&mut self, now_ms: i64) -> bool {
        if self.due_at.is_some() {
            self.coalesced += 1;
            return false;
        }
        self.due_at = Some(now_ms.saturating_add(self.delay_ms));
        true
    }

    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    /// Consume the pending request if its deadline has passed.
    pub fn fire_if_due(&mut self, now_ms: i64) -> bool {
        match self.due_at {
            Some(due) if now_ms >= due => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }

    /// Milliseconds until the pending render fires; `None` if idle.
    pub fn time_until_due(&self, now_ms: i64) -> Option<u64> {
        self.due_at
            .map(|due| u64::try_from(due.saturating_sub(now_ms)).unwrap_or(0))
    }

    pub fn cancel(&mut self) {
        self.due_at = None;
    }

    /// Requests folded into an already pending render so far.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_renders_once_at_first_deadline() {
        let mut d = Debouncer::new(500);
        assert!(d.request(0));
        assert!(!d.request(100));
        assert!(!d.request(400));
        assert!(!d.fire_if_due(499));
        assert!(d.fire_if_due(500));
        assert!(!d.fire_if_due(600));
        assert_eq!(d.coalesced(), 2);
    }

    #[test]
    fn cancel_clears_pending() {
        let mut d = Debouncer::default();
        d.request(0);
        assert_eq!(d.time_until_due(200), Some(300));
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.time_until_due(200), None);
    }
}
