//! Interactive square crop over a source image.
//!
//! The stage holds a zoom level and a centre offset and turns them into a
//! [`CropRegion`] on every change. Offsets are clamped whenever zoom or
//! offset changes, so [`CropStage::current_region`] is always inside the
//! source.

use crate::imaging::{
    CropRegion, Dimensions, calculate_crop_region, calculate_crop_side, calculate_default_region,
    clamp_offset,
};

/// Zoom at which the frame spans the source's short edge.
pub const MIN_ZOOM: f64 = 1.0;

/// Default upper zoom bound.
pub const DEFAULT_MAX_ZOOM: f64 = 3.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CropStage {
    source: Dimensions,
    max_zoom: f64,
    zoom: f64,
    offset: (f64, f64),
    region: CropRegion,
}

impl CropStage {
    /// Start at zoom 1.0 with the frame centred: the largest centred square.
    pub fn new(source: Dimensions, max_zoom: f64) -> Self {
        let max_zoom = if max_zoom.is_finite() {
            max_zoom.max(MIN_ZOOM)
        } else {
            DEFAULT_MAX_ZOOM
        };
        Self {
            source,
            max_zoom,
            zoom: MIN_ZOOM,
            offset: (0.0, 0.0),
            region: calculate_default_region(source),
        }
    }

    pub fn source(&self) -> Dimensions {
        self.source
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Frame centre offset from the source centre, in source pixels.
    pub fn offset(&self) -> (f64, f64) {
        self.offset
    }

    /// Set zoom, clamped to `[1.0, max_zoom]`. NaN resets to 1.0.
    pub fn set_zoom(&mut self, level: f64) -> CropRegion {
        self.zoom = if level.is_nan() {
            MIN_ZOOM
        } else {
            level.clamp(MIN_ZOOM, self.max_zoom)
        };
        self.recompute()
    }

    /// Move the frame centre to `(dx, dy)` from the source centre.
    pub fn set_offset(&mut self, dx: f64, dy: f64) -> CropRegion {
        self.offset = (dx, dy);
        self.recompute()
    }

    /// Shift the frame by `(dx, dy)` relative to where it is now.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> CropRegion {
        let (x, y) = self.offset;
        self.set_offset(x + dx, y + dy)
    }

    pub fn current_region(&self) -> CropRegion {
        self.region
    }

    fn recompute(&mut self) -> CropRegion {
        let side = calculate_crop_side(self.source, self.zoom);
        self.offset = clamp_offset(self.source, side, self.offset);
        self.region = calculate_crop_region(self.source, self.zoom, self.offset);
        self.region
    }
}
