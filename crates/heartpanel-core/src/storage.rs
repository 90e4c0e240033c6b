//! Durable key-value slot for the form snapshot.
//!
//! # Contract
//!
//! - [`PersistenceStore::save`] serializes the whole [`FormSnapshot`] and
//!   overwrites the slot. There is no merge and no history.
//! - [`PersistenceStore::load`] never fails. A missing slot, an unreadable
//!   backend, malformed JSON, or JSON of the wrong shape all yield
//!   [`FormSnapshot::default`]. Corruption is logged, never surfaced.
//! - The key carries a version suffix (`heart_inputs_v2`). A future snapshot
//!   shape gets a new key and simply ignores older data.
//!
//! # Backends
//!
//! | Backend         | Use                                         |
//! |-----------------|---------------------------------------------|
//! | [`MemoryStorage`] | tests, hosts that own persistence themselves |
//! | [`FileStorage`]   | one JSON file per key, atomic replace        |

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{StorageError, StorageResult};
use crate::snapshot::FormSnapshot;

/// Default versioned storage key.
pub const DEFAULT_STORAGE_KEY: &str = "heart_inputs_v2";

/// Minimal string key-value store, shaped like browser `localStorage`.
pub trait StorageBackend: Send {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    fn remove(&mut self, key: &str) -> StorageResult<()>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

/// In-memory backend.
///
/// Clones share the same map, so a test can keep a handle and inspect what
/// the controller wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored value, bypassing the trait.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Store raw text, bypassing snapshot serialization.
    pub fn insert_raw(&self, key: &str, value: impl Into<String>) {
        self.lock().insert(key.to_string(), value.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// File-backed storage: `<dir>/<key>.json`.
///
/// Writes go to a temp file that is then renamed over the target, so a crash
/// mid-write leaves either the old or the new snapshot.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as the storage root. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_error(&path)(error)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, value).map_err(io_error(&temp))?;
        std::fs::rename(&temp, &path).map_err(io_error(&path))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&path)(error)),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// The single snapshot slot, bound to one backend and one versioned key.
pub struct PersistenceStore {
    backend: Box<dyn StorageBackend>,
    key: String,
}

impl fmt::Debug for PersistenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceStore")
            .field("backend", &self.backend.name())
            .field("key", &self.key)
            .finish()
    }
}

impl PersistenceStore {
    pub fn new(backend: impl StorageBackend + 'static, key: impl Into<String>) -> Self {
        Self {
            backend: Box::new(backend),
            key: key.into(),
        }
    }

    /// Store bound to [`DEFAULT_STORAGE_KEY`].
    pub fn with_default_key(backend: impl StorageBackend + 'static) -> Self {
        Self::new(backend, DEFAULT_STORAGE_KEY)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialize and overwrite the slot.
    pub fn save(&mut self, snapshot: &FormSnapshot) -> StorageResult<()> {
        let json = serde_json::to_string(snapshot)?;
        self.backend.set(&self.key, &json)?;
        tracing::debug!(
            key = %self.key,
            backend = self.backend.name(),
            bytes = json.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Read the slot, treating anything unusable as "no data".
    #[must_use]
    pub fn load(&self) -> FormSnapshot {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return FormSnapshot::default(),
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "snapshot unreadable; starting empty");
                return FormSnapshot::default();
            }
        };
        match serde_json::from_str::<FormSnapshot>(&raw) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "snapshot malformed; starting empty");
                FormSnapshot::default()
            }
        }
    }

    /// Drop the stored snapshot entirely.
    pub fn clear(&mut self) -> StorageResult<()> {
        self.backend.remove(&self.key)
    }
}
