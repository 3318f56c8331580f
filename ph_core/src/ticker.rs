//! Periodic tick sources.
//!
//! `Ticker` spawns one thread that emits a timestamp every period over a
//! zero-capacity channel. A tick is handed over only if the consumer is
//! blocked in `wait_tick` at that moment; otherwise it is dropped and
//! counted, so a slow cycle never builds a backlog. That includes ticks
//! landing between two waits (after a timeout, or while the caller renders),
//! not only ticks that overlap an ingestion cycle. The thread is stopped and
//! joined on drop.
//!
//! `ManualTicks` is a synchronous source for driving the monitor by hand.
use crossbeam_channel as xch;
use ph_traits::Clock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickWait {
    /// A tick fired at the given epoch milliseconds.
    Tick(i64),
    /// Nothing arrived within the timeout.
    Timeout,
    /// The source is exhausted or stopped.
    Closed,
}

/// Something that produces ticks for the ingestion loop.
pub trait TickSource {
    fn wait_tick(&mut self, timeout: Duration) -> TickWait;
}

pub struct Ticker {
    rx: xch::Receiver<i64>,
    stop_tx: Option<xch::Sender<()>>,
    missed: Arc<AtomicU64>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl core::fmt::Debug for Ticker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ticker")
            .field("missed", &self.missed())
            .finish_non_exhaustive()
    }
}

impl Ticker {
    pub fn spawn<C: Clock + Send + 'static>(period: Duration, clock: C) -> Self {
        let (tx, rx) = xch::bounded::<i64>(0);
        let (stop_tx, stop_rx) = xch::bounded::<()>(1);
        let missed = Arc::new(AtomicU64::new(0));
        let missed_clone = missed.clone();
        let period = period.max(Duration::from_millis(1));

        let join_handle = std::thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(period) {
                    Err(xch::RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(xch::RecvTimeoutError::Disconnected) => {
                        tracing::debug!("ticker received shutdown signal");
                        break;
                    }
                }
                match tx.try_send(clock.now_ms()) {
                    Ok(()) => {}
                    Err(xch::TrySendError::Full(_)) => {
                        missed_clone.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("tick dropped: consumer not waiting");
                    }
                    Err(xch::TrySendError::Disconnected(_)) => {
                        tracing::debug!("ticker consumer disconnected, exiting thread");
                        break;
                    }
                }
            }
            tracing::trace!("ticker thread exiting cleanly");
        });

        Self {
            rx,
            stop_tx: Some(stop_tx),
            missed,
            join_handle: Some(join_handle),
        }
    }

    /// Ticks dropped because the consumer was not blocked in `wait_tick`
    /// when they fired, whatever it was doing instead.
    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }
}

impl TickSource for Ticker {
    fn wait_tick(&mut self, timeout: Duration) -> TickWait {
        match self.rx.recv_timeout(timeout) {
            Ok(ts) => TickWait::Tick(ts),
            Err(xch::RecvTimeoutError::Timeout) => TickWait::Timeout,
            Err(xch::RecvTimeoutError::Disconnected) => TickWait::Closed,
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.try_send(());
        }
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("ticker thread joined"),
                Err(e) => tracing::warn!(?e, "ticker thread panicked during shutdown"),
            }
        }
    }
}

/// Pre-loaded ticks, delivered in order without waiting.
#[derive(Debug, Default, Clone)]
pub struct ManualTicks {
    queue: VecDeque<i64>,
}

impl ManualTicks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ts_ms: i64) {
        self.queue.push_back(ts_ms);
    }

    /// Ticks at `start, start + every, ...`, `count` of them.
    pub fn every(start_ms: i64, every_ms: i64, count: usize) -> Self {
        let mut t = Self::new();
        for i in 0..count {
            let i = i64::try_from(i).unwrap_or(i64::MAX);
            t.push(start_ms.saturating_add(every_ms.saturating_mul(i)));
        }
        t
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl TickSource for ManualTicks {
    fn wait_tick(&mut self, _timeout: Duration) -> TickWait {
        self.queue.pop_front().map_or(TickWait::Closed, TickWait::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ph_traits::SystemClock;
    use std::time::Instant;

    #[test]
    fn ticker_delivers_and_stops_on_drop() {
        let mut t = Ticker::spawn(Duration::from_millis(5), SystemClock::new());
        let mut got = 0;
        let deadline = Instant::now() + Duration::from_secs(2);
        while got < 3 && Instant::now() < deadline {
            if let TickWait::Tick(_) = t.wait_tick(Duration::from_millis(100)) {
                got += 1;
            }
        }
        assert_eq!(got, 3);
        drop(t);
    }

    #[test]
    fn ticks_are_dropped_while_consumer_is_busy() {
        let t = Ticker::spawn(Duration::from_millis(2), SystemClock::new());
        std::thread::sleep(Duration::from_millis(50));
        assert!(t.missed() > 0);
    }

    #[test]
    fn manual_ticks_close_when_exhausted() {
        let mut t = ManualTicks::every(0, 5_000, 2);
        assert_eq!(t.wait_tick(Duration::ZERO), TickWait::Tick(0));
        assert_eq!(t.wait_tick(Duration::ZERO), TickWait::Tick(5_000));
        assert_eq!(t.wait_tick(Duration::ZERO), TickWait::Closed);
    }
}
