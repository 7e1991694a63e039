//! Pure calculation functions for crop geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! The crop frame is always square. Its position is described as an offset
//! of the frame centre from the source centre, in source pixels, so that
//! zoom changes keep the frame anchored where the user left it.

use super::params::{CropRegion, Dimensions};

/// Side of the square crop frame at a given zoom level.
///
/// At zoom 1.0 the frame spans the short edge of the source; at zoom 2.0 it
/// spans half of it. Never smaller than one pixel.
///
/// # Examples
/// ```
/// # use avatar_studio::imaging::calculate_crop_side;
/// use avatar_studio::imaging::Dimensions;
/// assert_eq!(calculate_crop_side(Dimensions::new(640, 480), 1.0), 480);
/// assert_eq!(calculate_crop_side(Dimensions::new(640, 480), 2.0), 240);
/// ```
pub fn calculate_crop_side(source: Dimensions, zoom: f64) -> u32 {
    let short = source.short_edge();
    if short == 0 {
        return 0;
    }
    let side = (short as f64 / zoom).floor() as u32;
    side.clamp(1, short)
}

/// Largest offset (per axis) the frame centre may move from the source
/// centre without the frame leaving the source.
pub fn calculate_max_offset(source: Dimensions, side: u32) -> (f64, f64) {
    let max_x = source.width.saturating_sub(side) as f64 / 2.0;
    let max_y = source.height.saturating_sub(side) as f64 / 2.0;
    (max_x, max_y)
}

/// Clamp an offset so the frame stays inside the source.
pub fn clamp_offset(source: Dimensions, side: u32, offset: (f64, f64)) -> (f64, f64) {
    let (max_x, max_y) = calculate_max_offset(source, side);
    (
        sanitize(offset.0).clamp(-max_x, max_x),
        sanitize(offset.1).clamp(-max_y, max_y),
    )
}

/// Compute the pixel region for a zoom level and centre offset.
///
/// The offset is clamped first, then the origin is rounded and clamped again
/// so rounding can never push the frame past the far edge.
pub fn calculate_crop_region(source: Dimensions, zoom: f64, offset: (f64, f64)) -> CropRegion {
    let side = calculate_crop_side(source, zoom);
    let (dx, dy) = clamp_offset(source, side, offset);
    let x = origin_for(source.width, side, dx);
    let y = origin_for(source.height, side, dy);
    CropRegion::new(x, y, side, side)
}

/// Largest centred square in the source (zoom 1.0, no offset).
pub fn calculate_default_region(source: Dimensions) -> CropRegion {
    calculate_crop_region(source, 1.0, (0.0, 0.0))
}

fn origin_for(extent: u32, side: u32, offset: f64) -> u32 {
    let max_origin = extent.saturating_sub(side);
    let centred = (extent as f64 - side as f64) / 2.0 + offset;
    (centred.round().max(0.0) as u32).min(max_origin)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
