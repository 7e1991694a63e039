//! Editor configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialised to a TOML table and the user file, if any, is merged on top, so
//! a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! dir = ".avatar-studio"     # Where the key/value slots live
//! key = "profile_image"      # Slot holding the avatar
//! quota_bytes = 5242880      # Total storage budget (0 = unlimited)
//!
//! [crop]
//! max_zoom = 3.0             # Zoom range is [1.0, max_zoom]
//! zoom_step = 0.1            # Step for zoom in / zoom out
//!
//! [generator]
//! count = 12                 # Avatars per batch
//! size = 128                 # Edge length in pixels (8..=1024)
//! style = "caricature"       # caricature | pixel-art | robots
//!
//! [camera]
//! source = "test-pattern"    # test-pattern | none | path to an image file
//! width = 640
//! height = 480
//! warmup_frames = 2
//!
//! [locale]
//! default_language = "en"    # es | en | de
//! # dir = "locales"          # Read <code>.json from here instead of the built-in tables
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::avatars::GeneratorConfig;
use crate::capture::{CaptureDevice, NoDevice, StillImageDevice, TestPatternDevice};
use crate::crop::DEFAULT_MAX_ZOOM;
use crate::imaging::Dimensions;
use crate::locale::{DirLocales, EmbeddedLocales, Language, LocaleProvider};
use crate::store::{DEFAULT_QUOTA_BYTES, LANGUAGE_KEY, PROFILE_IMAGE_KEY, validate_key};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Editor configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub storage: StorageConfig,
    pub crop: CropConfig,
    pub generator: GeneratorConfig,
    pub camera: CameraConfig,
    pub locale: LocaleConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if validate_key(&self.storage.key).is_err() {
            return Err(ConfigError::Validation(format!(
                "storage.key '{}' must be non-empty and use only letters, digits, '_', '-' or '.'",
                self.storage.key
            )));
        }
        if self.storage.key == LANGUAGE_KEY {
            return Err(ConfigError::Validation(format!(
                "storage.key cannot be '{LANGUAGE_KEY}' (reserved for the language preference)"
            )));
        }
        if !self.crop.max_zoom.is_finite() || self.crop.max_zoom < 1.0 {
            return Err(ConfigError::Validation(
                "crop.max_zoom must be at least 1.0".into(),
            ));
        }
        if !(self.crop.zoom_step.is_finite() && self.crop.zoom_step > 0.0) {
            return Err(ConfigError::Validation(
                "crop.zoom_step must be positive".into(),
            ));
        }
        if self.generator.count == 0 {
            return Err(ConfigError::Validation(
                "generator.count must be non-zero".into(),
            ));
        }
        if !(MIN_AVATAR_SIZE..=MAX_AVATAR_SIZE).contains(&self.generator.size) {
            return Err(ConfigError::Validation(format!(
                "generator.size must be between {MIN_AVATAR_SIZE} and {MAX_AVATAR_SIZE}"
            )));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Validation(
                "camera.width and camera.height must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

const MIN_AVATAR_SIZE: u32 = 8;
const MAX_AVATAR_SIZE: u32 = 1024;

/// Key/value storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the slots. Relative paths resolve against the
    /// config directory.
    pub dir: PathBuf,
    /// Slot holding the avatar.
    pub key: String,
    /// Total bytes across all slots. `0` disables the limit.
    pub quota_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".avatar-studio"),
            key: PROFILE_IMAGE_KEY.to_string(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl StorageConfig {
    pub fn quota(&self) -> Option<u64> {
        (self.quota_bytes > 0).then_some(self.quota_bytes)
    }
}

/// Crop stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    pub max_zoom: f64,
    pub zoom_step: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            max_zoom: DEFAULT_MAX_ZOOM,
            zoom_step: 0.1,
        }
    }
}

/// Camera feed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// `"test-pattern"`, `"none"`, or a path to an image file.
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// Empty frames the test pattern delivers before the first real one.
    pub warmup_frames: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: "test-pattern".to_string(),
            width: 640,
            height: 480,
            warmup_frames: 2,
        }
    }
}

/// Parsed form of [`CameraConfig::source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    TestPattern,
    None,
    File(PathBuf),
}

impl CameraConfig {
    pub fn source(&self) -> CameraSource {
        match self.source.trim() {
            "test-pattern" => CameraSource::TestPattern,
            "none" | "" => CameraSource::None,
            path => CameraSource::File(PathBuf::from(path)),
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// Build the configured device. File paths resolve against `base`.
    pub fn device(&self, base: &Path) -> Box<dyn CaptureDevice> {
        match self.source() {
            CameraSource::TestPattern => {
                Box::new(TestPatternDevice::new(self.dimensions(), self.warmup_frames))
            }
            CameraSource::None => Box::new(NoDevice::new("no camera configured")),
            CameraSource::File(path) => Box::new(StillImageDevice::new(base.join(path))),
        }
    }
}

/// UI language settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocaleConfig {
    /// Used until the user picks a language.
    pub default_language: Language,
    /// Directory of `<code>.json` tables. Built-in tables when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl LocaleConfig {
    /// Locale source. Relative directories resolve against `base`.
    pub fn provider(&self, base: &Path) -> Box<dyn LocaleProvider> {
        match &self.dir {
            Some(dir) => Box::new(DirLocales::new(base.join(dir))),
            None => Box::new(EmbeddedLocales),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EditorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Avatar Studio Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory holding the stored values, relative to this file.
dir = ".avatar-studio"

# Slot holding the avatar. "language" is reserved.
key = "profile_image"

# Total bytes across all stored values (0 = unlimited).
# 5 MiB matches the usual browser local-storage quota.
quota_bytes = 5242880

# ---------------------------------------------------------------------------
# Crop / zoom
# ---------------------------------------------------------------------------
[crop]
# Zoom range is [1.0, max_zoom]; 1.0 frames the whole short edge.
max_zoom = 3.0

# Step used by zoom in / zoom out.
zoom_step = 0.1

# ---------------------------------------------------------------------------
# Generated avatars
# ---------------------------------------------------------------------------
[generator]
# Avatars per batch.
count = 12

# Edge length of each avatar in pixels, 8 to 1024.
size = 128

# Style shown when the picker opens: "caricature", "pixel-art" or "robots".
style = "caricature"

# ---------------------------------------------------------------------------
# Camera
# ---------------------------------------------------------------------------
[camera]
# "test-pattern" for synthetic colour bars, "none" for no camera,
# or a path to an image file to use as the camera feed.
source = "test-pattern"

# Test pattern resolution.
width = 640
height = 480

# Empty frames delivered before the camera reports ready.
warmup_frames = 2

# ---------------------------------------------------------------------------
# Language
# ---------------------------------------------------------------------------
[locale]
# Used until a language is chosen: "es", "en" or "de".
default_language = "en"

# Directory with es.json / en.json / de.json to use instead of the
# built-in tables.
# dir = "locales"
"##
}
