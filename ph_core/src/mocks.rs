//! Probe and store doubles for tests and dry runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ph_traits::{KeyValueStore, PhProbe, StoreError, Subscription, SubscriptionCallback};

use crate::backends::MemoryStore;

/// A probe that always errors; for monitors fed through `ingest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProbe;

impl PhProbe for NoopProbe {
    fn read(&mut self, _timeout: Duration) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop probe")))
    }
}

/// Replays a fixed list of readings, then errors.
#[derive(Debug, Default, Clone)]
pub struct ScriptedProbe {
    values: VecDeque<f64>,
}

impl ScriptedProbe {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl PhProbe for ScriptedProbe {
    fn read(&mut self, _timeout: Duration) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        self.values
            .pop_front()
            .ok_or_else(|| "script exhausted".into())
    }
}

/// A `MemoryStore` whose writes can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: Arc<AtomicBool>,
}

impl FailingStore {
    /// Start out failing every append and clear.
    pub fn failing() -> Self {
        let s = Self::default();
        s.set_failing(true);
        s
    }

    pub fn set_failing(&self, on: bool) {
        self.failing.store(on, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err("store offline".into());
        }
        Ok(())
    }
}

impl KeyValueStore for FailingStore {
    fn append(&self, path: &str, record: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.append(path, record)
    }

    fn read_all(&self, path: &str) -> Result<Vec<String>, StoreError> {
        self.check()?;
        self.inner.read_all(path)
    }

    fn subscribe(
        &self,
        path: &str,
        callback: SubscriptionCallback,
    ) -> Result<Subscription, StoreError> {
        self.inner.subscribe(path, callback)
    }

    fn clear(&self, path: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.clear(path)
    }
}
