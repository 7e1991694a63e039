//! Procedural avatar generator.
//!
//! Produces a batch of square PNG avatars in one of three styles. Every
//! avatar is a pure function of `(style, seed, size)`: the seed string is
//! hashed with SHA-256 into the state of a [`StdRng`], and the style
//! renderer draws from that RNG alone. Re-rendering a [`GeneratedAvatar`]
//! from its `seed` reproduces it byte for byte.
//!
//! A batch either derives its seeds from one caller-supplied seed
//! (`"<seed>-0"`, `"<seed>-1"`, …) or draws a fresh random seed per avatar.
//! Rendering runs on rayon's pool.

mod draw;
mod styles;

use crate::imaging::rust_backend::encode_png;
use crate::imaging::{CodecError, Dimensions};
use crate::types::AvatarImage;
use image::{DynamicImage, ImageFormat};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Avatars per batch unless configured otherwise.
pub const DEFAULT_COUNT: usize = 12;

/// Edge length in pixels unless configured otherwise.
pub const DEFAULT_SIZE: u32 = 128;

const SEED_LEN: usize = 10;
const SEED_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    #[default]
    #[serde(alias = "avataaars")]
    Caricature,
    #[serde(alias = "pixel")]
    PixelArt,
    #[serde(alias = "bottts")]
    Robots,
}

impl Style {
    /// Styles in picker order.
    pub const ALL: [Style; 3] = [Style::Caricature, Style::PixelArt, Style::Robots];

    pub fn code(self) -> &'static str {
        match self {
            Style::Caricature => "caricature",
            Style::PixelArt => "pixel-art",
            Style::Robots => "robots",
        }
    }

    /// Translation key of the picker tab label.
    pub fn label_key(self) -> &'static str {
        match self {
            Style::Caricature => "caricature",
            Style::PixelArt => "pixel",
            Style::Robots => "robots",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown avatar style '{0}' (expected caricature, pixel-art or robots)")]
pub struct UnknownStyle(pub String);

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "caricature" | "avataaars" => Ok(Style::Caricature),
            "pixel-art" | "pixel" | "pixelart" => Ok(Style::PixelArt),
            "robots" | "robot" | "bottts" => Ok(Style::Robots),
            other => Err(UnknownStyle(other.to_string())),
        }
    }
}

/// `[generator]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Avatars per batch.
    pub count: usize,
    /// Edge length in pixels.
    pub size: u32,
    /// Style shown when the picker opens.
    pub style: Style,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            size: DEFAULT_SIZE,
            style: Style::default(),
        }
    }
}

/// One picker option.
#[derive(Debug, Clone)]
pub struct GeneratedAvatar {
    pub seed: String,
    pub style: Style,
    pub image: AvatarImage,
}

/// Render a batch of `count` avatars.
///
/// With `seed`, the batch is reproducible: avatar `i` uses `"<seed>-<i>"`.
/// Without, each avatar gets its own random seed.
pub fn generate(
    style: Style,
    count: usize,
    seed: Option<&str>,
    size: u32,
) -> Result<Vec<GeneratedAvatar>, CodecError> {
    let seeds: Vec<String> = match seed {
        Some(base) => (0..count).map(|i| format!("{base}-{i}")).collect(),
        None => {
            let mut rng = rand::thread_rng();
            (0..count).map(|_| random_seed(&mut rng)).collect()
        }
    };
    log::debug!("Generating {} {} avatars at {}px", count, style, size);

    seeds
        .into_par_iter()
        .map(|seed| -> Result<GeneratedAvatar, CodecError> {
            let image = render(style, &seed, size)?;
            Ok(GeneratedAvatar { seed, style, image })
        })
        .collect()
}

/// Render the single avatar for `(style, seed)`.
pub fn render(style: Style, seed: &str, size: u32) -> Result<AvatarImage, CodecError> {
    if size == 0 {
        return Err(CodecError::Encode("avatar size must be positive".into()));
    }
    let mut rng = rng_for(style, seed);
    let canvas = match style {
        Style::Caricature => styles::caricature(size, &mut rng),
        Style::PixelArt => styles::pixel_art(size, &mut rng),
        Style::Robots => styles::robot(size, &mut rng),
    };
    let bytes = encode_png(&DynamicImage::ImageRgba8(canvas.into_image()))?;
    Ok(AvatarImage::from_encoded(
        bytes,
        ImageFormat::Png,
        Dimensions::new(size, size),
    ))
}

fn rng_for(style: Style, seed: &str) -> StdRng {
    let mut hasher = Sha256::new();
    hasher.update(style.code().as_bytes());
    hasher.update(b":");
    hasher.update(seed.as_bytes());
    StdRng::from_seed(hasher.finalize().into())
}

fn random_seed(rng: &mut impl Rng) -> String {
    (0..SEED_LEN)
        .map(|_| SEED_ALPHABET[rng.gen_range(0..SEED_ALPHABET.len())] as char)
        .collect()
}
