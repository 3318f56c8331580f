//! Chart viewport: zoom over an already built series, right edge pinned to
//! now.

use serde::Serialize;

use crate::error::PhError;
use crate::series::{DEFAULT_MIN_WINDOW_S, Series, SeriesPoint};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    zoom: f64,
    min_visible_s: u64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            min_visible_s: DEFAULT_MIN_WINDOW_S,
        }
    }
}

impl Viewport {
    pub fn new(zoom: f64, min_visible_s: u64) -> Result<Self, PhError> {
        if !zoom.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
            return Err(PhError::InvalidInput(format!(
                "zoom {zoom} outside [{MIN_ZOOM}, {MAX_ZOOM}]"
            )));
        }
        Ok(Self {
            zoom,
            min_visible_s,
        })
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Multiply the zoom factor, clamping to the allowed range. Non-finite or
    /// non-positive multipliers are ignored.
    pub fn zoom_by(&mut self, factor: f64) -> f64 {
        if factor.is_finite() && factor > 0.0 {
            self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        }
        self.zoom
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
    }

    /// Seconds shown for a window of `window_s`: `window / zoom`, never less
    /// than the floor.
    pub fn visible_seconds(&self, window_s: u64) -> u64 {
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let scaled = (window_s as f64 / self.zoom).ceil() as u64;
        scaled.max(self.min_visible_s)
    }

    /// Points of `series` that fall in the visible range `[-visible, 0]`.
    pub fn visible_points<'a>(&self, series: &'a Series) -> &'a [SeriesPoint] {
        let visible = crate::util::ms_to_i64(self.visible_seconds(series.window_s));
        let from = series.points.partition_point(|p| p.offset_s < -visible);
        &series.points[from..]
    }
}
