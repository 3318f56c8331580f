//! Persistent key-value store seam.
//!
//! Records are opaque strings (the core writes one JSON object per record);
//! paths are slash-separated keys such as `users/<id>/phReadings`.

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Called with each record appended under a subscribed path.
pub type SubscriptionCallback = Box<dyn Fn(&str) + Send + Sync>;

pub trait KeyValueStore {
    /// Append one record under `path`.
    fn append(&self, path: &str, record: &str) -> Result<(), StoreError>;
    /// All records under `path` in insertion order. Missing paths are empty.
    fn read_all(&self, path: &str) -> Result<Vec<String>, StoreError>;
    /// Register `callback` for future appends under `path`. The returned
    /// handle unsubscribes when dropped or when `unsubscribe` is called.
    fn subscribe(&self, path: &str, callback: SubscriptionCallback)
    -> Result<Subscription, StoreError>;
    /// Remove every record under `path`.
    fn clear(&self, path: &str) -> Result<(), StoreError>;
}

/// Handle for a live store subscription.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Release the subscription now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
