//! Image codec trait and shared error type.
//!
//! The [`ImageCodec`] trait defines the two operations the editor needs:
//! decode a source and encode a crop.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` crate.

use super::data_uri::DataUriError;
use super::params::{CropRegion, Dimensions};
use crate::types::{AvatarImage, Source};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("'{0}' is not an image file")]
    InvalidFileType(String),
    #[error("Failed to decode {source_kind}: {reason}")]
    Decode {
        source_kind: &'static str,
        reason: String,
    },
    #[error("Invalid data URI: {0}")]
    DataUri(#[from] DataUriError),
    #[error("Crop region {region} is outside the {source_dims} source image")]
    CropOutOfBounds {
        region: CropRegion,
        source_dims: Dimensions,
    },
    #[error("Encoding failed: {0}")]
    Encode(String),
}

impl CodecError {
    pub(crate) fn decode(source_kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            source_kind,
            reason: reason.into(),
        }
    }

    /// Whether this is a decode failure in the user-facing sense (bad bytes,
    /// bad data URI, zero-sized raster).
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::DataUri(_))
    }
}

/// Trait for image codec backends.
///
/// Backends are pure: no method touches the filesystem or any shared state,
/// so the editor can be driven by a mock in tests.
pub trait ImageCodec {
    /// Turn a file, camera frame, or data URI into an [`AvatarImage`].
    ///
    /// Fails with [`CodecError::InvalidFileType`] for files that are not
    /// images and with a decode error for undecodable or zero-sized input.
    fn decode_source(&self, source: &Source) -> Result<AvatarImage, CodecError>;

    /// Rasterize exactly the pixels inside `region` into a new image of size
    /// `region.width × region.height`.
    fn encode_crop(
        &self,
        image: &AvatarImage,
        region: CropRegion,
    ) -> Result<AvatarImage, CodecError>;
}

impl<C: ImageCodec + ?Sized> ImageCodec for std::sync::Arc<C> {
    fn decode_source(&self, source: &Source) -> Result<AvatarImage, CodecError> {
        (**self).decode_source(source)
    }

    fn encode_crop(
        &self,
        image: &AvatarImage,
        region: CropRegion,
    ) -> Result<AvatarImage, CodecError> {
        (**self).encode_crop(image, region)
    }
}
