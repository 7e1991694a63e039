//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the editor (which decides which pixels to keep) and the
//! [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`Dimensions`] — Pixel size of a decoded raster.
//! - [`CropRegion`] — Rectangle in source-image pixel space selecting the
//!   committed sub-image.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel size of an image or frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Length of the shorter edge.
    pub fn short_edge(self) -> u32 {
        self.width.min(self.height)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangle in source-image pixel space.
///
/// The editor always produces squares (circular avatar frame), but the codec
/// accepts any non-empty rectangle that fits inside the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering the whole source.
    pub fn full(source: Dimensions) -> Self {
        Self::new(0, 0, source.width, source.height)
    }

    /// Output size after cropping to this region.
    pub fn dimensions(self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// True when the region is non-empty and lies entirely inside `source`.
    ///
    /// Uses checked arithmetic so regions near `u32::MAX` cannot wrap around
    /// into bounds.
    pub fn fits_within(self, source: Dimensions) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!(
            (right, bottom),
            (Some(r), Some(b)) if r <= source.width && b <= source.height
        )
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}
