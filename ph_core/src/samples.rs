//! Sample store: time-ordered pH samples within a retention window.

use crate::error::PhError;
use crate::persist::RecordLog;
use crate::sample::Sample;
use crate::util::days_to_ms;

/// Default retention, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Ordered, retention-bounded sample collection.
///
/// Samples are non-decreasing by timestamp. After every ingest, only samples
/// strictly newer than `now - retention` remain.
#[derive(Debug)]
pub struct SampleStore {
    samples: Vec<Sample>,
    retention_ms: i64,
    log: Option<RecordLog>,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(days_to_ms(DEFAULT_RETENTION_DAYS))
    }
}

impl SampleStore {
    pub fn new(retention_ms: i64) -> Self {
        Self {
            samples: Vec::new(),
            retention_ms: retention_ms.max(1),
            log: None,
        }
    }

    /// Persist each accepted sample to `log` before it is committed.
    pub fn with_log(mut self, log: RecordLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_ms
    }

    /// Accept one sample taken at or after the newest stored one, then evict
    /// samples that fell out of retention relative to `now_ms`.
    ///
    /// On error nothing changes, in memory or in the backing log.
    pub fn ingest(&mut self, sample: Sample, now_ms: i64) -> Result<(), PhError> {
        self.check_order(&sample)?;
        if let Some(log) = &self.log {
            log.append(&sample)?;
        }
        self.commit(sample, now_ms);
        Ok(())
    }

    /// Accept a sample that already lives in the backing store (e.g. one
    /// delivered by a subscription). Not re-persisted.
    pub fn ingest_replicated(&mut self, sample: Sample, now_ms: i64) -> Result<(), PhError> {
        self.check_order(&sample)?;
        self.commit(sample, now_ms);
        Ok(())
    }

    fn check_order(&self, sample: &Sample) -> Result<(), PhError> {
        match self.samples.last() {
            Some(last) if sample.timestamp_ms() < last.timestamp_ms() => {
                Err(PhError::ClockSkew {
                    latest_ms: last.timestamp_ms(),
                    got_ms: sample.timestamp_ms(),
                })
            }
            _ => Ok(()),
        }
    }

    fn commit(&mut self, sample: Sample, now_ms: i64) {
        self.samples.push(sample);
        self.evict(now_ms);
    }

    /// Drop every sample with `timestamp <= now - retention`.
    pub fn evict(&mut self, now_ms: i64) -> usize {
        let cutoff = now_ms.saturating_sub(self.retention_ms);
        let keep_from = self
            .samples
            .partition_point(|s| s.timestamp_ms() <= cutoff);
        if keep_from > 0 {
            self.samples.drain(..keep_from);
            tracing::debug!(evicted = keep_from, cutoff, "evicted expired samples");
        }
        keep_from
    }

    /// Replace contents with previously stored samples, sorting them and
    /// applying retention against `now_ms`.
    pub fn restore(&mut self, mut samples: Vec<Sample>, now_ms: i64) {
        samples.sort_by_key(Sample::timestamp_ms);
        self.samples = samples;
        self.evict(now_ms);
    }

    /// Samples ordered oldest first.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop all in-memory samples. The backing log is left to the caller.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
