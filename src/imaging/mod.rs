//! Image codec built on the `image` and `base64` crates.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` (format sniffed from bytes) |
//! | **Crop → PNG** | `crop_imm` + PNG encoder |
//! | **Data URI** | `base64` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop geometry (unit testable)
//! - **Parameters**: [`Dimensions`] and [`CropRegion`]
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Data URI**: the persisted string form of an image

pub mod backend;
mod calculations;
pub mod data_uri;
mod params;
pub mod rust_backend;

pub use backend::{CodecError, ImageCodec};
pub use calculations::{
    calculate_crop_region, calculate_crop_side, calculate_default_region, calculate_max_offset,
    clamp_offset,
};
pub use params::{CropRegion, Dimensions};
pub use rust_backend::{RustCodec, supported_input_extensions};
