//! JSON record log on top of a `KeyValueStore` path.

use std::sync::Arc;

use ph_traits::{KeyValueStore, Subscription, SubscriptionCallback};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PhError;

/// Shared handle to a store backend.
pub type SharedStore = Arc<dyn KeyValueStore + Send + Sync>;

/// One append-only collection (`users/<id>/phReadings`, ...).
#[derive(Clone)]
pub struct RecordLog {
    store: SharedStore,
    path: String,
}

impl core::fmt::Debug for RecordLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordLog")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RecordLog {
    pub fn new(store: SharedStore, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), PhError> {
        let line = serde_json::to_string(record)
            .map_err(|e| PhError::InvalidInput(format!("encode record: {e}")))?;
        self.store
            .append(&self.path, &line)
            .map_err(|e| PhError::StoreUnavailable(format!("append {}: {e}", self.path)))
    }

    /// Decode every record under the path. Records that fail to decode or
    /// validate are skipped with a warning.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>, PhError> {
        let raw = self
            .store
            .read_all(&self.path)
            .map_err(|e| PhError::StoreUnavailable(format!("read {}: {e}", self.path)))?;
        let mut out = Vec::with_capacity(raw.len());
        for (idx, line) in raw.iter().enumerate() {
            match serde_json::from_str::<T>(line) {
                Ok(v) => out.push(v),
                Err(e) => {
                    tracing::warn!(path = %self.path, idx, error = %e, "skipping malformed record");
                }
            }
        }
        Ok(out)
    }

    pub fn clear(&self) -> Result<(), PhError> {
        self.store
            .clear(&self.path)
            .map_err(|e| PhError::StoreUnavailable(format!("clear {}: {e}", self.path)))
    }

    pub fn subscribe(&self, callback: SubscriptionCallback) -> Result<Subscription, PhError> {
        self.store
            .subscribe(&self.path, callback)
            .map_err(|e| PhError::StoreUnavailable(format!("subscribe {}: {e}", self.path)))
    }
}

/// Store path holding a user's pH readings.
pub fn readings_path(user: &str) -> String {
    format!("users/{user}/phReadings")
}

/// Store path holding a user's dose log.
pub fn doses_path(user: &str) -> String {
    format!("users/{user}/pumpLogs")
}
