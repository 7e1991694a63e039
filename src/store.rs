//! Client-local persistence.
//!
//! Storage is modelled as a string key/value store ([`KeyValueStore`]), the
//! same shape as browser local storage. The avatar lives in a single slot
//! (default key [`PROFILE_IMAGE_KEY`]) as a `data:` URI; the language
//! preference shares the store under [`LANGUAGE_KEY`].
//!
//! ## Backends
//!
//! - [`FileStore`] — one file per key inside a directory. Writes go to a
//!   temporary sibling and are renamed into place, so a reader sees either
//!   the old value or the new one, never a partial write.
//! - [`MemoryStore`] — shared in-memory map; clones see the same data.
//!
//! Both enforce an optional byte quota and fail with
//! [`StoreError::QuotaExceeded`] instead of dropping the write.

use crate::imaging::ImageCodec;
use crate::types::{AvatarImage, Source};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Write `tmp` with `write`, then rename it over `path`. On any failure the
/// temporary file is removed and `path` keeps its previous contents.
fn replace_via_temp(
    tmp: &Path,
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> io::Result<()>,
) -> io::Result<()> {
    let result = fs::File::create(tmp)
        .and_then(|mut file| write(&mut file).and_then(|()| file.sync_all()))
        .and_then(|()| fs::rename(tmp, path));
    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }
    result
}

/// Key of the avatar slot.
pub const PROFILE_IMAGE_KEY: &str = "profile_image";

/// Key of the persisted language preference.
pub const LANGUAGE_KEY: &str = "language";

/// Typical browser local-storage quota (5 MiB).
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

const VALUE_EXTENSION: &str = "value";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage quota exceeded: {would_use} bytes needed, {quota} allowed")]
    QuotaExceeded { would_use: u64, quota: u64 },
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// String slots addressed by key.
///
/// Methods take `&self`: stores are shared handles, like the browser's
/// single local storage seen from several components.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the slot. All-or-nothing.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the slot. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

fn check_quota(quota: Option<u64>, would_use: u64) -> Result<(), StoreError> {
    match quota {
        Some(quota) if would_use > quota => Err(StoreError::QuotaExceeded { would_use, quota }),
        _ => Ok(()),
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Directory-backed store: `<dir>/<key>.value`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
}

impl FileStore {
    /// Open (and create if needed) a store directory.
    pub fn open(dir: impl Into<PathBuf>, quota: Option<u64>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{VALUE_EXTENSION}"))
    }

    /// Bytes used by all slots except `skip`.
    fn used_bytes_excluding(&self, skip: &Path) -> Result<u64, StoreError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path == skip {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) == Some(VALUE_EXTENSION) {
                total += fs::metadata(&path)?.len();
            }
        }
        Ok(total)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        match fs::read_to_string(self.slot_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let path = self.slot_path(key);
        if self.quota.is_some() {
            let would_use = self.used_bytes_excluding(&path)? + value.len() as u64;
            check_quota(self.quota, would_use)?;
        }
        let tmp = self.dir.join(format!(".{key}.tmp"));
        replace_via_temp(&tmp, &path, |file| file.write_all(value.as_bytes()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    slots: HashMap<String, String>,
    writes: usize,
}

/// In-memory store. Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: u64) -> Self {
        Self {
            inner: Arc::default(),
            quota: Some(quota),
        }
    }

    /// Number of successful `set`/`remove` calls so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        // A poisoned lock only means another holder panicked mid-test; the
        // map itself is always consistent because writes are single inserts.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        validate_key(key)?;
        Ok(self.lock().slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut inner = self.lock();
        let others: u64 = inner
            .slots
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(_, v)| v.len() as u64)
            .sum();
        check_quota(self.quota, others + value.len() as u64)?;
        inner.slots.insert(key.to_string(), value.to_string());
        inner.writes += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut inner = self.lock();
        inner.slots.remove(key);
        inner.writes += 1;
        Ok(())
    }
}

// =============================================================================
// Avatar slot
// =============================================================================

/// The single avatar slot on top of a key/value store.
#[derive(Debug, Clone)]
pub struct PersistenceStore<K> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> PersistenceStore<K> {
    pub fn new(kv: K) -> Self {
        Self::with_key(kv, PROFILE_IMAGE_KEY)
    }

    pub fn with_key(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Raw stored string, if any.
    pub fn load_raw(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(&self.key)
    }

    /// Read and decode the stored avatar.
    ///
    /// A stored value that no longer decodes is treated as absent; the slot
    /// is left untouched so nothing is lost if the codec is at fault.
    pub fn load(&self, codec: &dyn ImageCodec) -> Result<Option<AvatarImage>, StoreError> {
        let Some(raw) = self.load_raw()? else {
            return Ok(None);
        };
        match codec.decode_source(&Source::DataUri(raw)) {
            Ok(image) => Ok(Some(image)),
            Err(e) => {
                log::warn!("Ignoring undecodable value in slot '{}': {}", self.key, e);
                Ok(None)
            }
        }
    }

    /// Overwrite the slot with `image`.
    pub fn save(&self, image: &AvatarImage) -> Result<(), StoreError> {
        self.kv.set(&self.key, &image.to_data_uri())?;
        log::info!(
            "Saved avatar ({}, {} bytes) to slot '{}'",
            image.dimensions(),
            image.bytes().len(),
            self.key
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.kv.remove(&self.key)?;
        log::info!("Cleared slot '{}'", self.key);
        Ok(())
    }
}
