//! Shared test utilities for the avatar-studio test suite.
//!
//! Builds synthetic rasters in memory (no fixture files) and wires editors
//! over in-memory storage.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (mut editor, kv, device) = memory_editor(Dimensions::new(64, 64));
//! editor.handle(EditorEvent::OpenSelector).unwrap();
//! ```

use crate::capture::{Frame, TestPatternDevice};
use crate::config::EditorConfig;
use crate::editor::Editor;
use crate::imaging::{Dimensions, ImageCodec, RustCodec};
use crate::locale::{EmbeddedLocales, Language, Translator};
use crate::store::MemoryStore;
use crate::types::{AvatarImage, Source, UploadedFile};
use image::{ImageEncoder, RgbImage};

// =========================================================================
// Rasters
// =========================================================================

/// RGB frame whose pixel at (x, y) is `(x, y, x ^ y)` modulo 256.
pub fn gradient_frame(width: u32, height: u32) -> Frame {
    let img = gradient(width, height);
    Frame::new(img.into_raw(), width, height)
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    })
}

/// PNG-encoded gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// JPEG-encoded gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// A decoded PNG avatar of the given size.
pub fn sample_avatar(width: u32, height: u32) -> AvatarImage {
    RustCodec::new()
        .decode_source(&Source::Frame(gradient_frame(width, height)))
        .unwrap()
}

/// An uploaded PNG with an `image/png` MIME type.
pub fn png_upload(name: &str, width: u32, height: u32) -> UploadedFile {
    UploadedFile::new(name, Some("image/png".into()), png_bytes(width, height))
}

// =========================================================================
// Editor wiring
// =========================================================================

/// Editor over a fresh `MemoryStore` and a square-or-not test-pattern camera
/// with no warm-up. Returns handles to the store and device for assertions.
pub fn memory_editor(
    camera: Dimensions,
) -> (Editor<MemoryStore, TestPatternDevice>, MemoryStore, TestPatternDevice) {
    memory_editor_with(MemoryStore::new(), camera)
}

pub fn memory_editor_with(
    kv: MemoryStore,
    camera: Dimensions,
) -> (Editor<MemoryStore, TestPatternDevice>, MemoryStore, TestPatternDevice) {
    let device = TestPatternDevice::new(camera, 0);
    let translator = Translator::load(&EmbeddedLocales, &kv, Language::En);
    let editor = Editor::open(
        Box::new(RustCodec::new()),
        kv.clone(),
        device.clone(),
        translator,
        &EditorConfig::default(),
    );
    (editor, kv, device)
}
