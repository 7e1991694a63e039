//! Shared types passed between the editor's components.
//!
//! [`AvatarImage`] is the one value every component agrees on: the codec
//! produces it, the generator produces it, the crop stage reads its
//! dimensions, and the store persists it as a data URI.

use crate::capture::Frame;
use crate::imaging::{Dimensions, data_uri, supported_input_extensions};
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// An encoded raster plus its pixel dimensions.
///
/// Immutable and cheap to clone: the encoded bytes are shared. Edits go
/// through the codec and always produce a new instance.
#[derive(Clone, PartialEq, Eq)]
pub struct AvatarImage {
    bytes: Arc<[u8]>,
    format: ImageFormat,
    dimensions: Dimensions,
}

impl AvatarImage {
    /// Wrap already-encoded bytes. Callers are responsible for `dimensions`
    /// matching the encoded raster; only codec backends construct these.
    pub fn from_encoded(bytes: Vec<u8>, format: ImageFormat, dimensions: Dimensions) -> Self {
        Self {
            bytes: bytes.into(),
            format,
            dimensions,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height
    }

    /// Self-contained `data:` URI, the persisted representation.
    pub fn to_data_uri(&self) -> String {
        data_uri::format_data_uri(self.mime_type(), &self.bytes)
    }

    /// SHA-256 of the encoded bytes as a hex string.
    pub fn content_hash(&self) -> String {
        format!("{:x}", Sha256::digest(&self.bytes))
    }
}

impl fmt::Debug for AvatarImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarImage")
            .field("format", &self.format)
            .field("dimensions", &self.dimensions)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A file handed over by the file picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Original file name, used for the extension check and for messages.
    pub name: String,
    /// MIME type reported by the picker, if any.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes,
        }
    }

    /// Read a file from disk. No MIME type is attached; the extension decides.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::new(name, None, bytes))
    }

    /// Whether the picker would accept this as an image.
    ///
    /// A reported MIME type wins (`image/*`); without one, the extension must
    /// name a format the codec can decode.
    pub fn is_image(&self) -> bool {
        match &self.mime {
            Some(mime) => mime.trim().to_ascii_lowercase().starts_with("image/"),
            None => Path::new(&self.name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    supported_input_extensions()
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(ext))
                }),
        }
    }
}

/// Anything the codec can turn into an [`AvatarImage`].
#[derive(Debug, Clone)]
pub enum Source {
    File(UploadedFile),
    Frame(Frame),
    DataUri(String),
}

impl Source {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::File(_) => "file",
            Source::Frame(_) => "frame",
            Source::DataUri(_) => "data-uri",
        }
    }
}
