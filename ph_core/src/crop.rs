//! Crop catalog and the active target range.

use std::sync::{Arc, RwLock};

use crate::error::PhError;
use crate::threshold::TargetRange;

/// A named crop with its preferred pH band.
#[derive(Debug, Clone, PartialEq)]
pub struct Crop {
    pub name: String,
    pub range: TargetRange,
}

impl Crop {
    pub fn new(name: impl Into<String>, min_ph: f64, max_ph: f64) -> Result<Self, PhError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PhError::InvalidInput("crop name must not be empty".into()));
        }
        Ok(Self {
            name,
            range: TargetRange::new(min_ph, max_ph)?,
        })
    }
}

pub type TargetListener = Box<dyn Fn(&TargetRange) + Send + Sync>;

/// Supplies the target range on demand and announces changes.
pub trait TargetProvider {
    fn current(&self) -> TargetRange;
    fn on_change(&self, listener: TargetListener);
}

/// A fixed range; never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTarget(pub TargetRange);

impl TargetProvider for FixedTarget {
    fn current(&self) -> TargetRange {
        self.0
    }

    fn on_change(&self, _listener: TargetListener) {}
}

#[derive(Debug, Clone)]
struct Selection {
    crop: Option<String>,
    range: TargetRange,
}

/// Crop catalog with a current selection.
///
/// Selecting a crop replaces the target range wholesale and notifies every
/// listener with the new range.
pub struct CropTargets {
    catalog: Vec<Crop>,
    selection: RwLock<Selection>,
    listeners: RwLock<Vec<TargetListener>>,
}

impl core::fmt::Debug for CropTargets {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CropTargets")
            .field("catalog", &self.catalog)
            .field("selected", &self.selected())
            .field("range", &self.current())
            .finish_non_exhaustive()
    }
}

impl CropTargets {
    /// Start with `initial` as the active range and no crop selected.
    pub fn new(catalog: Vec<Crop>, initial: TargetRange) -> Self {
        Self {
            catalog,
            selection: RwLock::new(Selection {
                crop: None,
                range: initial,
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn catalog(&self) -> &[Crop] {
        &self.catalog
    }

    pub fn find(&self, name: &str) -> Option<&Crop> {
        self.catalog
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Name of the selected crop, if any.
    pub fn selected(&self) -> Option<String> {
        self.selection.read().ok().and_then(|s| s.crop.clone())
    }

    /// Select a crop from the catalog by name (case-insensitive).
    pub fn select(&self, name: &str) -> Result<TargetRange, PhError> {
        let crop = self
            .find(name)
            .ok_or_else(|| PhError::InvalidInput(format!("unknown crop '{name}'")))?;
        let range = crop.range;
        self.replace(Some(crop.name.clone()), range)?;
        tracing::info!(crop = %crop.name, range = %range, "crop selected");
        Ok(range)
    }

    /// Set a custom range, clearing the crop selection.
    pub fn set_range(&self, range: TargetRange) -> Result<(), PhError> {
        self.replace(None, range)
    }

    fn replace(&self, crop: Option<String>, range: TargetRange) -> Result<(), PhError> {
        {
            let mut sel = self
                .selection
                .write()
                .map_err(|_| PhError::State("crop selection lock poisoned".into()))?;
            *sel = Selection { crop, range };
        }
        if let Ok(listeners) = self.listeners.read() {
            for l in listeners.iter() {
                l(&range);
            }
        }
        Ok(())
    }
}

impl TargetProvider for CropTargets {
    fn current(&self) -> TargetRange {
        self.selection
            .read()
            .map(|s| s.range)
            .unwrap_or_default()
    }

    fn on_change(&self, listener: TargetListener) {
        if let Ok(mut l) = self.listeners.write() {
            l.push(listener);
        }
    }
}
