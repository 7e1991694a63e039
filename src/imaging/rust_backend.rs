//! Codec backend on top of the `image` crate.
//!
//! Decoders for the formats in [`supported_input_extensions`] are compiled
//! in; anything else is refused before decoding.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` (magic bytes, never the file name) |
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::load_from_memory_with_format` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode → PNG | `DynamicImage::write_to` with `ImageFormat::Png` |
//! | Data URI | `base64` standard engine |
//!
//! Camera frames and crops are encoded as PNG, so a crop is exactly one
//! lossless encode pass over the selected pixels. Uploaded files keep their
//! original encoding until they are cropped.

use super::backend::{CodecError, ImageCodec};
use super::data_uri::parse_data_uri;
use super::params::{CropRegion, Dimensions};
use crate::capture::Frame;
use crate::types::{AvatarImage, Source};
use image::{ColorType, DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::LazyLock;

/// Formats whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Sniff and decode an encoded raster held in memory.
fn load_image(bytes: &[u8], kind: &'static str) -> Result<(DynamicImage, ImageFormat), CodecError> {
    let format = image::guess_format(bytes)
        .map_err(|e| CodecError::decode(kind, format!("unrecognised format: {e}")))?;
    if !format.reading_enabled() {
        return Err(CodecError::decode(
            kind,
            format!("no decoder for {}", format.to_mime_type()),
        ));
    }
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CodecError::decode(kind, e.to_string()))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(CodecError::decode(kind, "image has zero dimensions"));
    }
    Ok((img, format))
}

/// Encode as PNG. Float rasters are narrowed to 8-bit RGBA first since PNG
/// cannot carry them.
pub(crate) fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let narrowed;
    let img = match img.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => {
            narrowed = DynamicImage::ImageRgba8(img.to_rgba8());
            &narrowed
        }
        _ => img,
    };
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| CodecError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

fn frame_to_image(frame: &Frame) -> Result<DynamicImage, CodecError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(CodecError::decode("frame", "frame has zero dimensions"));
    }
    let expected = frame.width as usize * frame.height as usize * frame.bytes_per_pixel();
    if frame.data.len() != expected {
        return Err(CodecError::decode(
            "frame",
            format!(
                "expected {expected} bytes for {}x{} RGB, got {}",
                frame.width,
                frame.height,
                frame.data.len()
            ),
        ));
    }
    RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| CodecError::decode("frame", "frame buffer does not match its dimensions"))
}

fn dimensions_of(img: &DynamicImage) -> Dimensions {
    Dimensions::new(img.width(), img.height())
}

impl ImageCodec for RustCodec {
    fn decode_source(&self, source: &Source) -> Result<AvatarImage, CodecError> {
        match source {
            Source::File(file) => {
                if !file.is_image() {
                    return Err(CodecError::InvalidFileType(file.name.clone()));
                }
                let (img, format) = load_image(&file.bytes, "file")?;
                Ok(AvatarImage::from_encoded(
                    file.bytes.clone(),
                    format,
                    dimensions_of(&img),
                ))
            }
            Source::Frame(frame) => {
                let img = frame_to_image(frame)?;
                let png = encode_png(&img)?;
                Ok(AvatarImage::from_encoded(
                    png,
                    ImageFormat::Png,
                    dimensions_of(&img),
                ))
            }
            Source::DataUri(uri) => {
                let parsed = parse_data_uri(uri)?;
                let (img, format) = load_image(&parsed.bytes, "data-uri")?;
                Ok(AvatarImage::from_encoded(
                    parsed.bytes,
                    format,
                    dimensions_of(&img),
                ))
            }
        }
    }

    fn encode_crop(
        &self,
        image: &AvatarImage,
        region: CropRegion,
    ) -> Result<AvatarImage, CodecError> {
        if !region.fits_within(image.dimensions()) {
            return Err(CodecError::CropOutOfBounds {
                region,
                source_dims: image.dimensions(),
            });
        }
        let (img, _) = load_image(image.bytes(), "avatar")?;
        let actual = dimensions_of(&img);
        if !region.fits_within(actual) {
            return Err(CodecError::CropOutOfBounds {
                region,
                source_dims: actual,
            });
        }
        let cropped = img.crop_imm(region.x, region.y, region.width, region.height);
        let png = encode_png(&cropped)?;
        Ok(AvatarImage::from_encoded(
            png,
            ImageFormat::Png,
            dimensions_of(&cropped),
        ))
    }
}
